//! Country-specific postal code canonicalization.
//!
//! Each rule pairs a pattern with an output template. Templates are plain
//! text with `\N` references to capture groups, e.g. `\1 \2` turns
//! `12345` into `123 45` for Greece. A postcode that does not match its
//! country's pattern in full is returned unchanged.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Built-in rules: `(country, pattern, template)`.
const DEFAULT_RULES: &[(&str, &str, &str)] = &[
    ("GR", r"([0-9]{3}) ?([0-9]{2})", r"\1 \2"),
    ("PL", r"([0-9]{2})-?([0-9]{3})", r"\1-\2"),
    ("SE", r"([0-9]{3}) ?([0-9]{2})", r"\1 \2"),
    ("SK", r"([0-9]{3}) ?([0-9]{2})", r"\1 \2"),
    ("IR", r"([0-9]{5}) ?([0-9]{5})", r"\1 \2"),
    ("LV", r"(LV-)?([0-9]{4})", r"LV-\2"),
];

static DEFAULT_NORMALIZER: LazyLock<PostalCodeNormalizer> = LazyLock::new(|| {
    PostalCodeNormalizer::with_default_rules().expect("built-in postcode rules are valid")
});

/// Errors raised while building a normalizer rule.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The pattern is not a valid regular expression.
    #[error("Invalid postcode pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A `\` in the template is not followed by a group number.
    #[error("Missing group index at byte {position} in template '{template}'")]
    MissingGroupIndex {
        /// The offending template.
        template: String,
        /// Byte offset of the backslash.
        position: usize,
    },

    /// Group references are not strictly increasing from 1.
    #[error("Group {index} out of order in template '{template}'")]
    GroupOutOfOrder {
        /// The offending template.
        template: String,
        /// The out-of-order group index.
        index: usize,
    },

    /// The template references a group the pattern does not have.
    #[error("Template '{template}' references group {index} but the pattern has {groups}")]
    UnknownGroup {
        /// The offending template.
        template: String,
        /// The referenced group index.
        index: usize,
        /// Number of capture groups in the pattern.
        groups: usize,
    },
}

/// A compiled `(pattern, template)` pair.
#[derive(Debug, Clone)]
pub struct NormalizerRule {
    pattern: Regex,
    separators: Vec<String>,
    group_indices: Vec<usize>,
}

impl NormalizerRule {
    /// Compiles a rule.
    ///
    /// The pattern always has to match the whole postcode.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if the pattern does not compile or the
    /// template's group references are malformed, out of order, or point
    /// at groups the pattern does not define.
    pub fn new(pattern: &str, template: &str) -> Result<Self, TemplateError> {
        let pattern = Regex::new(&format!("^(?:{pattern})$"))?;
        let (separators, group_indices) = parse_template(template)?;

        let groups = pattern.captures_len() - 1;
        if let Some(&index) = group_indices.iter().find(|&&index| index > groups) {
            return Err(TemplateError::UnknownGroup {
                template: template.to_string(),
                index,
                groups,
            });
        }

        Ok(Self {
            pattern,
            separators,
            group_indices,
        })
    }

    /// Applies the rule, returning `None` when the postcode does not match.
    #[must_use]
    pub fn apply(&self, postcode: &str) -> Option<String> {
        let captures = self.pattern.captures(postcode)?;

        let mut result = self.separators[0].clone();
        for (index, separator) in self.group_indices.iter().zip(&self.separators[1..]) {
            result.push_str(captures.get(*index).map_or("", |m| m.as_str()));
            result.push_str(separator);
        }

        Some(result)
    }
}

/// Splits a template into literal separators and group indices.
///
/// There is always exactly one more separator than there are indices.
fn parse_template(template: &str) -> Result<(Vec<String>, Vec<usize>), TemplateError> {
    let mut separators = Vec::new();
    let mut group_indices: Vec<usize> = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        if c != '\\' {
            literal.push(c);
            continue;
        }

        let mut digits = String::new();
        while let Some(&(_, d)) = chars.peek() {
            if !d.is_ascii_digit() {
                break;
            }
            digits.push(d);
            chars.next();
        }

        let index: usize = digits
            .parse()
            .map_err(|_| TemplateError::MissingGroupIndex {
                template: template.to_string(),
                position,
            })?;

        let previous = group_indices.last().copied().unwrap_or(0);
        if index <= previous {
            return Err(TemplateError::GroupOutOfOrder {
                template: template.to_string(),
                index,
            });
        }

        separators.push(std::mem::take(&mut literal));
        group_indices.push(index);
    }

    separators.push(literal);
    Ok((separators, group_indices))
}

/// Per-country postcode rules, keyed by upper-cased country code.
///
/// The table is read-only once built and safe to share between threads.
#[derive(Debug, Clone, Default)]
pub struct PostalCodeNormalizer {
    rules: BTreeMap<String, NormalizerRule>,
}

impl PostalCodeNormalizer {
    /// Creates a normalizer without any rules.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Creates a normalizer with the built-in country rules.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if a built-in rule is malformed.
    pub fn with_default_rules() -> Result<Self, TemplateError> {
        DEFAULT_RULES
            .iter()
            .try_fold(Self::new(), |normalizer, (country, pattern, template)| {
                normalizer.rule(country, pattern, template)
            })
    }

    /// The shared normalizer with the built-in rules.
    #[must_use]
    pub fn global() -> &'static Self {
        &DEFAULT_NORMALIZER
    }

    /// Registers a rule for `country_code`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if the rule is malformed.
    pub fn rule(
        mut self,
        country_code: &str,
        pattern: &str,
        template: &str,
    ) -> Result<Self, TemplateError> {
        let rule = NormalizerRule::new(pattern, template)?;
        self.rules.insert(country_code.to_uppercase(), rule);
        Ok(self)
    }

    /// Canonicalizes `postcode` for `country_code`.
    ///
    /// Unknown countries and non-matching postcodes pass through
    /// unchanged.
    #[must_use]
    pub fn normalize<'a>(&self, country_code: &str, postcode: &'a str) -> Cow<'a, str> {
        self.rules
            .get(&country_code.to_uppercase())
            .and_then(|rule| rule.apply(postcode))
            .map_or(Cow::Borrowed(postcode), Cow::Owned)
    }
}

/// Canonicalizes `postcode` with the built-in rules.
#[must_use]
pub fn normalize<'a>(country_code: &str, postcode: &'a str) -> Cow<'a, str> {
    PostalCodeNormalizer::global().normalize(country_code, postcode)
}
