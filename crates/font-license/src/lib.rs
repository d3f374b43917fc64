//! Curated free alternatives for well-known commercial families.

use std::collections::HashMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::debug;
use font_core::FontCategory;
use font_normalizer::{lookup_key, prefix_related, suffix_variants};

/// Shortest name that may take part in a prefix match
const MIN_PREFIX_LEN: usize = 3;

/// A hand-picked free replacement for a commercial family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeAlternative {
    pub family: &'static str,
    /// Curated closeness, 0 to 100
    pub similarity: u8,
    pub license: &'static str,
    pub reason: &'static str,
}

/// A commercial family and its five curated alternatives
#[derive(Debug, Clone, Serialize)]
pub struct CommercialFamily {
    pub name: &'static str,
    pub category: FontCategory,
    pub alternatives: [FreeAlternative; 5],
}

/// Which lookup step resolved a declared family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LookupStep {
    Exact,
    SuffixStripped,
    Prefix,
    FirstWord,
}

#[derive(Debug, Clone, Copy)]
pub struct OverrideMatch<'a> {
    pub family: &'a CommercialFamily,
    pub step: LookupStep,
}

const fn alt(
    family: &'static str,
    similarity: u8,
    license: &'static str,
    reason: &'static str,
) -> FreeAlternative {
    FreeAlternative { family, similarity, license, reason }
}

const OFL: &str = "OFL-1.1";
const APACHE: &str = "Apache-2.0";
const UFL: &str = "UFL-1.0";

static COMMERCIAL_FAMILIES: &[CommercialFamily] = &[
    CommercialFamily {
        name: "Helvetica Neue",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Inter", 92, OFL, "Neo-grotesque built for screens with matching proportions"),
            alt("Roboto", 88, APACHE, "Grotesque skeleton with similar x-height and tight apertures"),
            alt("Public Sans", 86, OFL, "Neutral grotesque with Helvetica-like rhythm"),
            alt("IBM Plex Sans", 80, OFL, "Grotesque with comparable weight range"),
            alt("Work Sans", 78, OFL, "Grotesque with slightly wider forms"),
        ],
    },
    CommercialFamily {
        name: "Helvetica",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Arimo", 94, APACHE, "Metric-compatible with Helvetica and Arial"),
            alt("Inter", 90, OFL, "Neo-grotesque with close proportions"),
            alt("Roboto", 87, APACHE, "Similar grotesque skeleton"),
            alt("Public Sans", 85, OFL, "Neutral grotesque in the same tradition"),
            alt("Work Sans", 78, OFL, "Grotesque with wider forms"),
        ],
    },
    CommercialFamily {
        name: "Arial",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Arimo", 96, APACHE, "Metric-compatible with Arial"),
            alt("Liberation Sans", 95, OFL, "Metric-compatible with Arial"),
            alt("Roboto", 85, APACHE, "Similar grotesque proportions"),
            alt("Open Sans", 80, OFL, "Neutral sans with comparable widths"),
            alt("Noto Sans", 80, OFL, "Neutral sans with broad coverage"),
        ],
    },
    CommercialFamily {
        name: "Univers",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Inter", 86, OFL, "Neo-grotesque with rational construction"),
            alt("Roboto", 84, APACHE, "Grotesque with similar stroke endings"),
            alt("Karla", 78, OFL, "Grotesque with compact forms"),
            alt("Public Sans", 80, OFL, "Neutral grotesque"),
            alt("Arimo", 80, APACHE, "Swiss-style grotesque metrics"),
        ],
    },
    CommercialFamily {
        name: "Futura",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Jost", 93, OFL, "Geometric sans modelled on Futura"),
            alt("League Spartan", 86, OFL, "Geometric sans with Futura-like capitals"),
            alt("Poppins", 84, OFL, "Geometric sans with circular bowls"),
            alt("Montserrat", 80, OFL, "Geometric sans with wider capitals"),
            alt("Nunito Sans", 74, OFL, "Rounded geometric construction"),
        ],
    },
    CommercialFamily {
        name: "Avenir",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Nunito Sans", 88, OFL, "Geometric humanist sans close to Avenir"),
            alt("Figtree", 86, OFL, "Clean geometric sans with similar texture"),
            alt("Mulish", 84, OFL, "Minimalist geometric sans"),
            alt("Montserrat", 80, OFL, "Geometric sans with comparable weights"),
            alt("Jost", 78, OFL, "Geometric sans with Futura roots"),
        ],
    },
    CommercialFamily {
        name: "Proxima Nova",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Montserrat", 90, OFL, "Geometric sans with very similar capitals"),
            alt("Figtree", 87, OFL, "Geometric sans with matching x-height"),
            alt("Mulish", 84, OFL, "Geometric sans with open forms"),
            alt("Nunito Sans", 82, OFL, "Humanist-geometric blend"),
            alt("Raleway", 75, OFL, "Elegant geometric sans"),
        ],
    },
    CommercialFamily {
        name: "Gill Sans",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Cabin", 86, OFL, "Humanist sans inspired by Edward Johnston and Eric Gill"),
            alt("Lato", 82, OFL, "Humanist sans with classical proportions"),
            alt("Hind", 78, OFL, "Humanist sans with similar stroke modulation"),
            alt("Source Sans 3", 78, OFL, "Humanist sans with generous counters"),
            alt("Mukta", 74, OFL, "Humanist sans with compact forms"),
        ],
    },
    CommercialFamily {
        name: "Frutiger",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Hind", 88, OFL, "Humanist sans close to Frutiger"),
            alt("Source Sans 3", 86, OFL, "Humanist sans with open apertures"),
            alt("Istok Web", 82, OFL, "Humanist sans for signage-like text"),
            alt("Mukta", 80, OFL, "Humanist sans in the Frutiger tradition"),
            alt("Open Sans", 80, OFL, "Humanist sans with open forms"),
        ],
    },
    CommercialFamily {
        name: "Myriad",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Source Sans 3", 92, OFL, "Humanist sans by the same type design tradition"),
            alt("PT Sans", 85, OFL, "Humanist sans with similar widths"),
            alt("Open Sans", 84, OFL, "Humanist sans with open apertures"),
            alt("Fira Sans", 80, OFL, "Humanist sans with comparable texture"),
            alt("Hind", 78, OFL, "Humanist sans with similar color"),
        ],
    },
    CommercialFamily {
        name: "Segoe UI",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Open Sans", 88, OFL, "Humanist UI sans with similar metrics"),
            alt("Noto Sans", 86, OFL, "Humanist UI sans"),
            alt("Source Sans 3", 84, OFL, "Humanist sans for interfaces"),
            alt("Lato", 80, OFL, "Semi-rounded humanist sans"),
            alt("Hind", 78, OFL, "Humanist sans with compact widths"),
        ],
    },
    CommercialFamily {
        name: "SF Pro",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Inter", 92, OFL, "UI neo-grotesque with matching proportions"),
            alt("Roboto", 86, APACHE, "UI grotesque with similar metrics"),
            alt("Figtree", 82, OFL, "Friendly geometric UI sans"),
            alt("Manrope", 80, OFL, "Modern grotesque for interfaces"),
            alt("Public Sans", 80, OFL, "Neutral interface sans"),
        ],
    },
    CommercialFamily {
        name: "Calibri",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Carlito", 97, OFL, "Metric-compatible with Calibri"),
            alt("Lato", 85, OFL, "Semi-rounded humanist sans with similar color"),
            alt("Open Sans", 80, OFL, "Humanist sans with comparable x-height"),
            alt("Source Sans 3", 80, OFL, "Humanist sans with similar widths"),
            alt("PT Sans", 76, OFL, "Humanist sans with narrower forms"),
        ],
    },
    CommercialFamily {
        name: "Verdana",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Noto Sans", 86, OFL, "Wide humanist sans for small sizes"),
            alt("Open Sans", 84, OFL, "Humanist sans with open apertures"),
            alt("PT Sans", 80, OFL, "Humanist sans with clear forms"),
            alt("Ubuntu", 78, UFL, "Humanist sans with generous spacing"),
            alt("Hind", 76, OFL, "Humanist sans for screens"),
        ],
    },
    CommercialFamily {
        name: "Franklin Gothic",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Libre Franklin", 94, OFL, "Open interpretation of Franklin Gothic"),
            alt("Archivo", 84, OFL, "Grotesque with American gothic roots"),
            alt("Work Sans", 80, OFL, "Grotesque with similar color"),
            alt("Oswald", 74, OFL, "Condensed gothic in the same genre"),
            alt("Roboto", 74, APACHE, "Grotesque with comparable weights"),
        ],
    },
    CommercialFamily {
        name: "Circular",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("DM Sans", 88, OFL, "Low-contrast geometric sans with similar warmth"),
            alt("Outfit", 86, OFL, "Geometric sans with round bowls"),
            alt("Plus Jakarta Sans", 84, OFL, "Geometric sans for interfaces"),
            alt("Manrope", 82, OFL, "Semi-condensed geometric grotesque"),
            alt("Figtree", 82, OFL, "Friendly geometric sans"),
        ],
    },
    CommercialFamily {
        name: "Optima",
        category: FontCategory::SansSerif,
        alternatives: [
            alt("Marcellus", 84, OFL, "Flared capitals in the Optima spirit"),
            alt("Tenor Sans", 82, OFL, "Humanist sans with calligraphic flare"),
            alt("Belleza", 80, OFL, "Humanist sans with classical proportions"),
            alt("Alegreya Sans", 78, OFL, "Calligraphic humanist sans"),
            alt("Philosopher", 72, OFL, "Flared sans with Optima-like stroke endings"),
        ],
    },
    CommercialFamily {
        name: "Times New Roman",
        category: FontCategory::Serif,
        alternatives: [
            alt("Tinos", 96, APACHE, "Metric-compatible with Times New Roman"),
            alt("Liberation Serif", 95, OFL, "Metric-compatible with Times New Roman"),
            alt("PT Serif", 82, OFL, "Transitional serif with similar texture"),
            alt("Source Serif 4", 80, OFL, "Transitional serif for text"),
            alt("Noto Serif", 80, OFL, "Text serif with comparable proportions"),
        ],
    },
    CommercialFamily {
        name: "Georgia",
        category: FontCategory::Serif,
        alternatives: [
            alt("Gelasio", 95, OFL, "Metric-compatible with Georgia"),
            alt("Merriweather", 86, OFL, "Screen serif with large x-height"),
            alt("PT Serif", 82, OFL, "Transitional serif for screens"),
            alt("Noto Serif", 80, OFL, "Text serif with sturdy serifs"),
            alt("Libre Baskerville", 76, OFL, "Text serif optimized for the web"),
        ],
    },
    CommercialFamily {
        name: "Cambria",
        category: FontCategory::Serif,
        alternatives: [
            alt("Caladea", 97, APACHE, "Metric-compatible with Cambria"),
            alt("Merriweather", 84, OFL, "Sturdy screen serif"),
            alt("PT Serif", 82, OFL, "Transitional serif"),
            alt("Source Serif 4", 80, OFL, "Transitional serif for text"),
            alt("Noto Serif", 80, OFL, "Text serif with similar proportions"),
        ],
    },
    CommercialFamily {
        name: "Garamond",
        category: FontCategory::Serif,
        alternatives: [
            alt("EB Garamond", 95, OFL, "Revival of Claude Garamont's designs"),
            alt("Cormorant Garamond", 88, OFL, "Display-oriented Garamond revival"),
            alt("Crimson Text", 84, OFL, "Old-style serif in the Garamond tradition"),
            alt("Sorts Mill Goudy", 76, OFL, "Old-style serif with similar color"),
            alt("Libre Caslon Text", 74, OFL, "Old-style serif for body text"),
        ],
    },
    CommercialFamily {
        name: "Palatino",
        category: FontCategory::Serif,
        alternatives: [
            alt("Crimson Pro", 84, OFL, "Calligraphic old-style serif"),
            alt("Cardo", 82, OFL, "Renaissance serif with broad forms"),
            alt("Gentium Book Plus", 82, OFL, "Humanist serif with Palatino-like flow"),
            alt("Spectral", 78, OFL, "Elegant screen serif"),
            alt("Domine", 74, OFL, "Sturdy text serif"),
        ],
    },
    CommercialFamily {
        name: "Baskerville",
        category: FontCategory::Serif,
        alternatives: [
            alt("Libre Baskerville", 93, OFL, "Web-optimized Baskerville revival"),
            alt("Baskervville", 92, OFL, "Revival of Baskerville's types"),
            alt("Cormorant", 80, OFL, "High-contrast transitional serif"),
            alt("Crimson Text", 80, OFL, "Book serif with similar color"),
            alt("EB Garamond", 76, OFL, "Old-style serif for text"),
        ],
    },
    CommercialFamily {
        name: "Didot",
        category: FontCategory::Serif,
        alternatives: [
            alt("Playfair Display", 88, OFL, "High-contrast didone for display"),
            alt("Bodoni Moda", 88, OFL, "Modern didone with optical sizes"),
            alt("Libre Bodoni", 84, OFL, "Didone revival for text"),
            alt("GFS Didot", 84, OFL, "Didot revival"),
            alt("Prata", 78, OFL, "Didone with sharp contrast"),
        ],
    },
    CommercialFamily {
        name: "Bodoni",
        category: FontCategory::Serif,
        alternatives: [
            alt("Bodoni Moda", 94, OFL, "Bodoni revival with optical sizes"),
            alt("Libre Bodoni", 92, OFL, "Bodoni revival for text"),
            alt("Playfair Display", 84, OFL, "High-contrast transitional display serif"),
            alt("Prata", 78, OFL, "Didone with sharp contrast"),
            alt("Abril Fatface", 72, OFL, "Heavy didone for headlines"),
        ],
    },
    CommercialFamily {
        name: "Courier",
        category: FontCategory::Monospace,
        alternatives: [
            alt("Courier Prime", 95, OFL, "Typewriter monospace designed as a Courier replacement"),
            alt("Cousine", 93, APACHE, "Metric-compatible with Courier New"),
            alt("IBM Plex Mono", 80, OFL, "Monospace with typewriter flavor"),
            alt("Source Code Pro", 78, OFL, "Monospace for code"),
            alt("Space Mono", 74, OFL, "Geometric monospace with slab details"),
        ],
    },
    CommercialFamily {
        name: "Consolas",
        category: FontCategory::Monospace,
        alternatives: [
            alt("Inconsolata", 92, OFL, "Humanist coding monospace inspired by Consolas"),
            alt("Source Code Pro", 86, OFL, "Coding monospace with similar widths"),
            alt("JetBrains Mono", 84, OFL, "Coding monospace with tall x-height"),
            alt("Fira Code", 82, OFL, "Coding monospace with ligatures"),
            alt("Roboto Mono", 80, APACHE, "Monospace with clean forms"),
        ],
    },
    CommercialFamily {
        name: "Menlo",
        category: FontCategory::Monospace,
        alternatives: [
            alt("JetBrains Mono", 86, OFL, "Coding monospace with similar texture"),
            alt("Source Code Pro", 85, OFL, "Coding monospace"),
            alt("Roboto Mono", 84, APACHE, "Clean monospace"),
            alt("Fira Mono", 84, OFL, "Humanist monospace"),
            alt("Ubuntu Mono", 78, UFL, "Humanist monospace with narrow widths"),
        ],
    },
    CommercialFamily {
        name: "Monaco",
        category: FontCategory::Monospace,
        alternatives: [
            alt("Roboto Mono", 86, APACHE, "Monospace with wide forms"),
            alt("Fira Mono", 84, OFL, "Humanist monospace"),
            alt("JetBrains Mono", 84, OFL, "Coding monospace"),
            alt("Source Code Pro", 82, OFL, "Coding monospace"),
            alt("Ubuntu Mono", 76, UFL, "Humanist monospace"),
        ],
    },
    CommercialFamily {
        name: "Comic Sans",
        category: FontCategory::Handwriting,
        alternatives: [
            alt("Comic Neue", 94, OFL, "Refined take on Comic Sans"),
            alt("Patrick Hand", 80, OFL, "Casual handwritten sans"),
            alt("Short Stack", 78, OFL, "Comic lettering style"),
            alt("Architects Daughter", 72, OFL, "Casual handwriting"),
            alt("Gochi Hand", 70, OFL, "Informal marker handwriting"),
        ],
    },
    CommercialFamily {
        name: "Brush Script",
        category: FontCategory::Handwriting,
        alternatives: [
            alt("Dancing Script", 84, OFL, "Lively connected script"),
            alt("Yellowtail", 82, APACHE, "Brush script with retro flavor"),
            alt("Sacramento", 78, OFL, "Monoline connected script"),
            alt("Great Vibes", 76, OFL, "Flowing formal script"),
            alt("Allura", 74, OFL, "Calligraphic script"),
        ],
    },
];

/// Normalized family name to index in `COMMERCIAL_FAMILIES`
static INDEX: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    COMMERCIAL_FAMILIES
        .iter()
        .enumerate()
        .map(|(i, family)| (lookup_key(family.name), i))
        .collect()
});

/// Looks up curated free alternatives for commercial family names.
#[derive(Debug, Clone, Copy, Default)]
pub struct LicenseChecker;

impl LicenseChecker {
    pub fn new() -> Self {
        Self
    }

    /// All curated commercial families, in table order
    pub fn families(&self) -> &'static [CommercialFamily] {
        COMMERCIAL_FAMILIES
    }

    /// Resolve a declared family name against the override table.
    ///
    /// Tries, in order: the exact normalized name; the name with trailing
    /// suffix tokens ("Pro", "Neue", weights...) removed one at a time; prefix
    /// containment in either direction (longest table entry wins); and a match
    /// on the first word when that word is longer than three characters.
    pub fn find_override(&self, declared: &str) -> Option<OverrideMatch<'static>> {
        let key = lookup_key(declared);
        if key.is_empty() {
            return None;
        }

        let found = self
            .exact(&key)
            .map(|family| (family, LookupStep::Exact))
            .or_else(|| {
                suffix_variants(&key)
                    .iter()
                    .find_map(|variant| self.exact(variant))
                    .map(|family| (family, LookupStep::SuffixStripped))
            })
            .or_else(|| self.by_prefix(&key).map(|family| (family, LookupStep::Prefix)))
            .or_else(|| self.by_first_word(&key).map(|family| (family, LookupStep::FirstWord)));

        found.map(|(family, step)| {
            debug!(declared, commercial = family.name, ?step, "curated override matched");
            OverrideMatch { family, step }
        })
    }

    fn exact(&self, key: &str) -> Option<&'static CommercialFamily> {
        INDEX.get(key).map(|&i| &COMMERCIAL_FAMILIES[i])
    }

    fn by_prefix(&self, key: &str) -> Option<&'static CommercialFamily> {
        COMMERCIAL_FAMILIES
            .iter()
            .map(|family| (family, lookup_key(family.name)))
            .filter(|(_, name)| prefix_related(key, name, MIN_PREFIX_LEN))
            .max_by_key(|(_, name)| name.len())
            .map(|(family, _)| family)
    }

    fn by_first_word(&self, key: &str) -> Option<&'static CommercialFamily> {
        let first = key.split(' ').next().filter(|w| w.chars().count() > 3)?;
        COMMERCIAL_FAMILIES
            .iter()
            .find(|family| lookup_key(family.name).split(' ').next() == Some(first))
    }
}
