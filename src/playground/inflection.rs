//! # Inflection
//!
//! English pluralization rules for model names and a humanizer for
//! validation messages. Only the rules that matter for identifier-style
//! names are covered; model keys are expected to be lower-case ASCII.

/// Words that are identical in singular and plural form
const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "news",
    "metadata",
    "data",
];

/// (singular, plural) pairs that do not follow the suffix rules
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("ox", "oxen"),
    ("leaf", "leaves"),
    ("knife", "knives"),
    ("life", "lives"),
    ("wife", "wives"),
    ("half", "halves"),
    ("wolf", "wolves"),
    ("shelf", "shelves"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
    ("quiz", "quizzes"),
    ("status", "statuses"),
    ("bus", "buses"),
    // Singular nouns ending in -s
    ("gas", "gases"),
    ("canvas", "canvases"),
    ("atlas", "atlases"),
    ("alias", "aliases"),
    ("bias", "biases"),
    ("lens", "lenses"),
    ("bonus", "bonuses"),
    ("campus", "campuses"),
    ("census", "censuses"),
    ("virus", "viruses"),
    ("plus", "pluses"),
];

/// Split `snake_case_word` into (`snake_case_`, `word`) so rules only touch
/// the last segment.
fn split_last(word: &str) -> (&str, &str) {
    match word.rfind('_') {
        Some(pos) => word.split_at(pos + 1),
        None => ("", word),
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Pluralize a model name: `recipe` → `recipes`, `category` → `categories`,
/// `line_item` → `line_items`.
pub fn pluralize(word: &str) -> String {
    let (prefix, last) = split_last(word);
    if last.is_empty() || UNCOUNTABLE.contains(&last) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, p)| *s == last || *p == last) {
        return format!("{}{}", prefix, plural);
    }

    let plural = if let Some(stem) = last.strip_suffix('y') {
        match stem.chars().last() {
            Some(c) if !is_vowel(c) => format!("{}ies", stem),
            _ => format!("{}s", last),
        }
    } else if last.ends_with("ss")
        || last.ends_with('x')
        || last.ends_with('z')
        || last.ends_with("ch")
        || last.ends_with("sh")
    {
        format!("{}es", last)
    } else if last.ends_with('s') {
        // Plural already, unless listed in IRREGULAR
        last.to_string()
    } else {
        format!("{}s", last)
    };

    format!("{}{}", prefix, plural)
}

/// Singularize a model name: `recipes` → `recipe`, `categories` → `category`.
///
/// Singular input is returned unchanged, so lookups can singularize
/// unconditionally.
pub fn singularize(word: &str) -> String {
    let (prefix, last) = split_last(word);
    if last.is_empty() || UNCOUNTABLE.contains(&last) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(s, p)| *p == last || *s == last) {
        return format!("{}{}", prefix, singular);
    }

    let singular = if let Some(stem) = last.strip_suffix("ies") {
        if stem.is_empty() {
            last.to_string()
        } else {
            format!("{}y", stem)
        }
    } else if let Some(stem) = strip_es(last) {
        stem
    } else if last.ends_with("ss") || last.ends_with("us") || last.ends_with("is") {
        last.to_string()
    } else if let Some(stem) = last.strip_suffix('s') {
        stem.to_string()
    } else {
        last.to_string()
    };

    format!("{}{}", prefix, singular)
}

/// `boxes` → `box`, `addresses` → `address`
fn strip_es(word: &str) -> Option<String> {
    for suffix in ["sses", "xes", "zes", "ches", "shes"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            return Some(format!("{}{}", stem, &suffix[..suffix.len() - 2]));
        }
    }
    None
}

/// Turn an attribute name into a label: `first_name` → `First name`,
/// `author_id` → `Author`.
pub fn humanize(attribute: &str) -> String {
    let base = attribute.strip_suffix("_id").unwrap_or(attribute);
    let spaced = base.replace('_', " ");
    let spaced = spaced.trim();

    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
