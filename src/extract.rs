//! Rule-driven field extraction from normalized content
//!
//! Every platform owns a [`Strategy`]: an ordered list of compiled rules plus
//! the date formats for that platform. Extraction is a pure function of the
//! subject line and the [`NormalizedContent`], so the same email always
//! yields the same [`RawFieldSet`].

pub(crate) mod airbnb;
pub(crate) mod booking_com;
pub(crate) mod generic;
pub(crate) mod vrbo;

use crate::config::{PostProcessor, RuleConfig};
use crate::dates::DateNormalizer;
use crate::normalize::NormalizedContent;
use crate::types::{Field, Platform, RawData};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use tracing::debug;

// Shared value fragments for rule patterns. Each holds exactly one capture group.

/// Uppercase/digit token such as `VR12345` or `HMABCD1234`; pair with [`PostProcessor::Identifier`]
pub(crate) const RESERVATION_VALUE: &str = r"([A-Z0-9][A-Z0-9\-]{3,})";

/// Capitalized run of words on a single line
pub(crate) const NAME_VALUE: &str = r"(\p{Lu}[\p{L}'’\-]*(?:[ \t]+\p{L}[\p{L}'’.\-]*)*)";

/// Numeric, slash, ISO and spelled-month dates, with an optional weekday
pub(crate) const DATE_VALUE: &str = r"(\d{1,2}/\d{1,2}/\d{4}|\d{4}-\d{2}-\d{2}|(?:[A-Za-z]{3,9},?[ \t]+)?(?:[A-Za-z]{3,9}\.?[ \t]+\d{1,2},?[ \t]+\d{4}|\d{1,2}[ \t]+[A-Za-z]{3,9}[ \t]+\d{4}))";

/// Signed amount with optional currency symbol or code on either side; `.` and `,` both allowed as separators
pub(crate) const AMOUNT_VALUE: &str = r"(-?[ \t]*(?:[A-Z]{3}[ \t]*)?[$€£¥]?[ \t]*-?\d(?:[\d.,]*\d)?(?:[ \t]*[A-Z]{3}\b)?)";

/// Spelled month and day (`Jul 1`), without a capture group
pub(crate) const MONTH_DAY: &str = r"[A-Za-z]{3,9}\.?[ \t]+\d{1,2}";

static AMOUNT_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d(?:[\d.,]*\d)?").unwrap());

/// A three-letter code directly before or after the number
static ADJACENT_CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z]{3})[ \t]*[$€£¥]?[ \t]*-?[ \t]*\d|\d[ \t]*([A-Z]{3})\b").unwrap()
});

static YEAR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{4}\b").unwrap());

/// ISO 4217 codes accepted next to an amount
const KNOWN_CURRENCIES: &[&str] = &[
    "AED", "ARS", "AUD", "BRL", "CAD", "CHF", "CLP", "CNY", "COP", "CZK", "DKK", "EUR", "GBP",
    "HKD", "HUF", "IDR", "ILS", "INR", "ISK", "JPY", "KRW", "MAD", "MXN", "MYR", "NOK", "NZD",
    "PEN", "PHP", "PLN", "RON", "SEK", "SGD", "THB", "TRY", "TWD", "USD", "VND", "ZAR",
];

/// `label: value` on one line, labels matched case-insensitively
pub(crate) fn labeled(labels: &str, value: &str) -> String {
    format!(r"(?i:\b(?:{labels}))[ \t]*[:#]+[ \t]*{value}")
}

/// A date following its label, possibly on the next line
pub(crate) fn dated(labels: &str) -> String {
    format!(r"(?i:\b(?:{labels}))[:\s]*{DATE_VALUE}")
}

/// Rules every platform shares, appended after the platform-specific ones
pub(crate) fn common_rules() -> Vec<RuleConfig> {
    use Field::{
        BookingDate, CheckInDate, CheckOutDate, Currency, GuestEmail, GuestPhone, NumberOfGuests, PropertyId,
        TotalAmount,
    };

    vec![
        RuleConfig::pattern(
            GuestPhone,
            labeled(
                r"phone(?:[ \t]+(?:number|no\.?))?|tel|telephone|mobile",
                r"(\+?[\d(][\d\-() .]{5,}\d)",
            ),
            PostProcessor::Phone,
        ),
        RuleConfig::cell(GuestPhone, &["phone", "phone number", "telephone"], PostProcessor::Phone),
        RuleConfig::pattern(
            GuestEmail,
            labeled(
                r"(?:guest[ \t]+)?e-?mail(?:[ \t]+address)?",
                r"([A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,})",
            ),
            PostProcessor::Trim,
        ),
        RuleConfig::cell(GuestEmail, &["email", "e-mail", "email address"], PostProcessor::Trim),
        RuleConfig::pattern(
            PropertyId,
            r"(?i:\b(?:property|listing|unit)[ \t]+(?:id|number|#))[ \t]*[:#]*[ \t]*([A-Za-z0-9][A-Za-z0-9\-]{2,})",
            PostProcessor::Trim,
        ),
        RuleConfig::cell(PropertyId, &["property id", "listing id", "unit id"], PostProcessor::Trim),
        RuleConfig::pattern(
            NumberOfGuests,
            labeled(
                r"number[ \t]+of[ \t]+guests|guests|guest[ \t]+count|travell?ers",
                r"(-?\d+(?:[.,]\d+)?)",
            ),
            PostProcessor::Trim,
        ),
        RuleConfig::pattern(
            NumberOfGuests,
            r"\b(\d+)[ \t]+(?i:guests?|travell?ers)\b",
            PostProcessor::Trim,
        ),
        RuleConfig::cell(NumberOfGuests, &["guests", "number of guests", "travelers"], PostProcessor::Trim),
        RuleConfig::pattern(
            TotalAmount,
            format!(
                r"(?i:\b(?:sub)?total(?:[ \t]+(?:price|amount|paid|payout|cost|charged))?(?:[ \t]*\([a-z]{{3}}\))?)[ \t]*:[ \t]*{AMOUNT_VALUE}"
            ),
            PostProcessor::Amount,
        ),
        RuleConfig::cell(TotalAmount, &["total", "total price", "total amount", "subtotal"], PostProcessor::Amount),
        RuleConfig::pattern(
            Currency,
            r"(?i:\btotal)[^\n:(]*\(([A-Za-z]{3})\)",
            PostProcessor::Currency,
        ),
        RuleConfig::label(Currency, &["currency"], PostProcessor::Currency),
        RuleConfig::pattern(
            BookingDate,
            dated(r"booked[ \t]+on|booking[ \t]+date|reservation[ \t]+date|date[ \t]+booked"),
            PostProcessor::Trim,
        ),
        // unlabeled stay dates: the first two spelled-out dates in the body
        RuleConfig::date_pair(
            CheckInDate,
            CheckOutDate,
            format!(r"\b({MONTH_DAY},[ \t]*\d{{4}})\b"),
            PostProcessor::Trim,
        ),
    ]
}

/// Where a match was found; also the primary tie-break order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrigin {
    Subject,
    Body,
    Table,
}

/// One matched value for a field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawMatch {
    /// Value after post-processing
    pub value: String,

    /// Text exactly as matched
    pub raw: String,

    pub origin: MatchOrigin,

    /// Byte offset in the subject or text, or the row index for table matches
    pub position: usize,
}

impl RawMatch {
    const fn order_key(&self) -> (MatchOrigin, usize) {
        (self.origin, self.position)
    }

    /// Whether a currency symbol or three-letter code sits next to the number
    #[must_use]
    pub fn is_currency_adjacent(&self) -> bool {
        currency_marker(&self.raw).is_some()
    }
}

/// Fields found in one email, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawFieldSet {
    fields: BTreeMap<Field, RawMatch>,
    candidates: BTreeMap<Field, Vec<RawMatch>>,
    ambiguous: BTreeSet<Field>,
}

impl RawFieldSet {
    /// Best match for a field
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&RawMatch> {
        self.fields.get(&field)
    }

    /// Post-processed value of the best match
    #[must_use]
    pub fn value(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(|m| m.value.as_str())
    }

    /// Every match kept for a collect-all field, in document order
    #[must_use]
    pub fn candidates(&self, field: Field) -> &[RawMatch] {
        self.candidates.get(&field).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_ambiguous(&self, field: Field) -> bool {
        self.ambiguous.contains(&field)
    }

    pub fn ambiguous_fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.ambiguous.iter().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &RawMatch)> {
        self.fields.iter().map(|(f, m)| (*f, m))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Audit view: raw text per field, all candidates, ambiguous field names
    #[must_use]
    pub fn to_raw_data(&self) -> RawData {
        let mut data = RawData::new();

        for (field, m) in &self.fields {
            data.insert(field.as_str().to_string(), Value::String(m.raw.clone()));
        }

        for (field, candidates) in &self.candidates {
            if candidates.len() > 1 {
                data.insert(
                    format!("{field}_candidates"),
                    Value::Array(
                        candidates
                            .iter()
                            .map(|m| Value::String(m.raw.clone()))
                            .collect(),
                    ),
                );
            }
        }

        if !self.ambiguous.is_empty() {
            data.insert(
                "ambiguous_fields".to_string(),
                Value::Array(
                    self.ambiguous
                        .iter()
                        .map(|f| Value::String(f.as_str().to_string()))
                        .collect(),
                ),
            );
        }

        data
    }
}

#[derive(Debug, Clone)]
pub(crate) enum CompiledMatcher {
    Pattern(Regex),
    Subject(Regex),
    /// Lowercased, longest first
    Label(Vec<String>),
    /// Lowercased
    Cell(Vec<String>),
    SubjectRange(Regex, Field),
    DatePair(Regex, Field),
}

/// A compiled extraction rule
#[derive(Debug, Clone)]
pub struct Rule {
    field: Field,
    matcher: CompiledMatcher,
    post: PostProcessor,
}

impl Rule {
    pub(crate) const fn new(field: Field, matcher: CompiledMatcher, post: PostProcessor) -> Self {
        Self {
            field,
            matcher,
            post,
        }
    }

    #[must_use]
    pub const fn field(&self) -> Field {
        self.field
    }

    /// Second field filled by a range rule
    const fn end_field(&self) -> Option<Field> {
        match &self.matcher {
            CompiledMatcher::SubjectRange(_, end) | CompiledMatcher::DatePair(_, end) => Some(*end),
            _ => None,
        }
    }

    /// Every match of this rule, in document order, tagged with the field it fills
    fn find_all(&self, subject: &str, content: &NormalizedContent) -> Vec<(Field, RawMatch)> {
        let mut found = Vec::new();
        let mut push = |field: Field, raw: &str, origin: MatchOrigin, position: usize| {
            let value = self.post.apply(raw);
            if !value.is_empty() {
                found.push((
                    field,
                    RawMatch {
                        value,
                        raw: raw.trim().to_string(),
                        origin,
                        position,
                    },
                ));
            }
        };
        let field = self.field;

        match &self.matcher {
            CompiledMatcher::Pattern(re) => {
                for caps in re.captures_iter(&content.text) {
                    if let Some(m) = caps.get(1).or_else(|| caps.get(0)) {
                        push(field, m.as_str(), MatchOrigin::Body, m.start());
                    }
                }
            }
            CompiledMatcher::Subject(re) => {
                for caps in re.captures_iter(subject) {
                    if let Some(m) = caps.get(1).or_else(|| caps.get(0)) {
                        push(field, m.as_str(), MatchOrigin::Subject, m.start());
                    }
                }
            }
            CompiledMatcher::Label(labels) => {
                let lines = line_offsets(&content.text);
                for (index, &(offset, line)) in lines.iter().enumerate() {
                    let Some(rest) = labels.iter().find_map(|l| after_label(line, l)) else {
                        continue;
                    };
                    if rest.is_empty() {
                        // label on its own line, value on the next
                        if let Some(&(next_offset, next)) = lines.get(index + 1) {
                            push(field, next, MatchOrigin::Body, next_offset);
                        }
                    } else {
                        push(field, rest, MatchOrigin::Body, offset + line.len() - rest.len());
                    }
                }
            }
            CompiledMatcher::Cell(labels) => {
                for (index, row) in content.table_rows.iter().enumerate() {
                    let [key, value, ..] = row.as_slice() else {
                        continue;
                    };
                    let key = key.trim().trim_end_matches([':', '#']).trim().to_lowercase();
                    if labels.contains(&key) {
                        push(field, value, MatchOrigin::Table, index);
                    }
                }
            }
            CompiledMatcher::SubjectRange(re, end) => {
                if let Some(caps) = re.captures(subject)
                    && let (Some(from), Some(to)) = (caps.get(1), caps.get(2))
                {
                    let year = caps.get(3).map(|m| m.as_str());
                    push(field, &with_year(from.as_str(), year), MatchOrigin::Subject, from.start());
                    push(*end, &with_year(to.as_str(), year), MatchOrigin::Subject, to.start());
                }
            }
            CompiledMatcher::DatePair(re, end) => {
                let mut dates = re
                    .captures_iter(&content.text)
                    .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)));
                if let (Some(from), Some(to)) = (dates.next(), dates.next()) {
                    push(field, from.as_str(), MatchOrigin::Body, from.start());
                    push(*end, to.as_str(), MatchOrigin::Body, to.start());
                }
            }
        }

        found
    }
}

/// `Jul 1` plus year `2024` becomes `Jul 1, 2024`; a part with its own year is kept
fn with_year(part: &str, year: Option<&str>) -> String {
    let part = part.trim();
    year.filter(|_| !YEAR_REGEX.is_match(part))
        .map_or_else(|| part.to_string(), |year| format!("{part}, {year}"))
}

/// Text following `label` and a `:`/`#` separator; empty when the label stands alone
fn after_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }

    let rest = line[label.len()..].trim_start();
    if rest.is_empty() {
        return Some("");
    }
    if !rest.starts_with([':', '#']) {
        return None;
    }

    Some(rest.trim_start_matches(|c: char| c == ':' || c == '#' || c.is_whitespace()))
}

fn line_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    text.split('\n')
        .map(|line| {
            let entry = (offset, line);
            offset += line.len() + 1;
            entry
        })
        .collect()
}

impl PostProcessor {
    /// Apply the cleanup to a matched string; an empty result discards the match
    #[must_use]
    pub fn apply(self, raw: &str) -> String {
        match self {
            Self::Trim => collapse(raw),
            Self::Uppercase => collapse(raw).to_uppercase(),
            Self::Digits => raw.chars().filter(char::is_ascii_digit).collect(),
            Self::Identifier => normalize_identifier(raw),
            Self::Phone => collapse(
                &raw.chars()
                    .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '))
                    .collect::<String>(),
            ),
            Self::Amount => normalize_amount(raw),
            Self::Currency => {
                let value = collapse(raw);
                currency_marker(&value).unwrap_or(value)
            }
        }
    }
}

/// `"4021.331.554"` becomes `"4021331554"`, `"ABC-123"` stays; no digit means no identifier
fn normalize_identifier(raw: &str) -> String {
    let value = collapse(raw);
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return String::new();
    }

    if value.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | ' ')) {
        value.chars().filter(char::is_ascii_digit).collect()
    } else {
        value
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `"-$1,250.50 USD"` becomes `"-1250.50"`, `"€ 1.234,56"` becomes `"1234.56"`
///
/// The sign counts only when it precedes the number. A number whose
/// separators cannot be read unambiguously is returned as written, which
/// validation rejects as an invalid amount. No digits means no amount.
fn normalize_amount(raw: &str) -> String {
    let Some(token) = AMOUNT_TOKEN_REGEX.find(raw) else {
        return String::new();
    };

    let Some(number) = canonical_number(token.as_str()) else {
        debug!("Amount {:?} has ambiguous separators", token.as_str());
        return token.as_str().to_string();
    };

    let trimmed = raw.trim();
    let negative = raw[..token.start()].contains('-')
        || (trimmed.starts_with('(') && trimmed.ends_with(')'));

    if negative {
        format!("-{number}")
    } else {
        number
    }
}

/// Rewrite a digit run with `.`/`,` separators as `1234.56`
///
/// The last separator is the decimal point when one or two digits follow it.
/// Every other separator must be the other character and split the integer
/// part into groups of three. A lone separator followed by exactly three
/// digits is read as grouping, so `1,234` and `1.234` are both `1234`.
fn canonical_number(token: &str) -> Option<String> {
    let Some(last) = token.rfind([',', '.']) else {
        return Some(token.to_string());
    };

    let decimals = &token[last + 1..];
    let (integer, fraction) = if (1..=2).contains(&decimals.len()) {
        (&token[..last], Some(decimals))
    } else {
        (token, None)
    };

    if let Some(group_sep) = integer.chars().find(|c| matches!(c, ',' | '.')) {
        if fraction.is_some() && token[last..].starts_with(group_sep) {
            return None;
        }

        let mut groups = integer.split([',', '.']);
        let head = groups.next()?;
        if head.len() > 3 || head.starts_with('0') || integer.contains(other_separator(group_sep)) {
            return None;
        }
        if !groups.all(|group| group.len() == 3) {
            return None;
        }
    }

    let mut number: String = integer.chars().filter(char::is_ascii_digit).collect();
    if let Some(fraction) = fraction {
        number.push('.');
        number.push_str(fraction);
    }
    Some(number)
}

const fn other_separator(sep: char) -> char {
    if sep == ',' { '.' } else { ',' }
}

/// Currency code implied by the text around an amount, or spelled out as a code
///
/// A known code right next to the number wins, then a visible symbol, then a
/// value that is nothing but a three-letter code. Other capitalized words
/// (`VAT`, `TAX`) never count.
#[must_use]
pub fn currency_marker(raw: &str) -> Option<String> {
    let adjacent = ADJACENT_CODE_REGEX.captures_iter(raw).find_map(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .filter(|code| KNOWN_CURRENCIES.contains(code))
    });
    if let Some(code) = adjacent {
        return Some(code.to_string());
    }

    let symbol = if raw.contains('€') {
        Some("EUR")
    } else if raw.contains('£') {
        Some("GBP")
    } else if raw.contains('¥') {
        Some("JPY")
    } else if raw.contains('$') {
        Some("USD")
    } else {
        None
    };
    if let Some(code) = symbol {
        return Some(code.to_string());
    }

    let trimmed = raw.trim();
    (trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| trimmed.to_ascii_uppercase())
}

/// Choose the amount among several candidates
///
/// Matches next to a currency marker win over bare numbers; within the
/// preferred group the last one by origin and position wins.
#[must_use]
pub fn pick_amount(candidates: &[RawMatch]) -> Option<&RawMatch> {
    let adjacent: Vec<&RawMatch> = candidates
        .iter()
        .filter(|m| m.is_currency_adjacent())
        .collect();

    if adjacent.is_empty() {
        candidates.iter().max_by_key(|m| m.order_key())
    } else {
        adjacent.into_iter().max_by_key(|m| m.order_key())
    }
}

/// Extraction strategy for one platform
#[derive(Debug, Clone)]
pub struct Strategy {
    platform: Platform,
    rules: Vec<Rule>,
    collect_all: BTreeSet<Field>,
    dates: DateNormalizer,
}

impl Strategy {
    pub(crate) const fn new(
        platform: Platform,
        rules: Vec<Rule>,
        collect_all: BTreeSet<Field>,
        dates: DateNormalizer,
    ) -> Self {
        Self {
            platform,
            rules,
            collect_all,
            dates,
        }
    }

    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub const fn dates(&self) -> &DateNormalizer {
        &self.dates
    }

    /// Run every rule against the subject and content
    #[must_use]
    pub fn extract(&self, subject: &str, content: &NormalizedContent) -> RawFieldSet {
        let mut matches: BTreeMap<Field, Vec<RawMatch>> = BTreeMap::new();
        for rule in &self.rules {
            // range rules only fill dates no earlier rule found
            if let Some(end) = rule.end_field()
                && (matches.contains_key(&rule.field) || matches.contains_key(&end))
            {
                continue;
            }

            for (field, found) in rule.find_all(subject, content) {
                matches.entry(field).or_default().push(found);
            }
        }

        let mut set = RawFieldSet::default();
        for (field, mut found) in matches {
            let winner = if self.collect_all.contains(&field) {
                found.sort_by_key(RawMatch::order_key);
                found.dedup_by(|a, b| a.order_key() == b.order_key() && a.value == b.value);
                let winner = pick_amount(&found).cloned();
                set.candidates.insert(field, found.clone());
                winner
            } else {
                found.first().cloned()
            };

            let Some(winner) = winner else {
                continue;
            };
            if found.iter().any(|m| m.value != winner.value) {
                set.ambiguous.insert(field);
            }
            set.fields.insert(field, winner);
        }

        if !set.fields.contains_key(&Field::Currency)
            && let Some(amount) = set.fields.get(&Field::TotalAmount)
            && let Some(code) = currency_marker(&amount.raw)
        {
            let derived = RawMatch {
                value: code,
                raw: amount.raw.clone(),
                origin: amount.origin,
                position: amount.position,
            };
            set.fields.insert(Field::Currency, derived);
        }

        debug!(
            "Extracted {} fields for {} ({} ambiguous)",
            set.len(),
            self.platform,
            set.ambiguous.len()
        );

        set
    }
}

/// One strategy per platform variant
#[derive(Debug, Clone)]
pub(crate) struct Strategies {
    pub(crate) vrbo: Strategy,
    pub(crate) airbnb: Strategy,
    pub(crate) booking_com: Strategy,
    pub(crate) unknown: Strategy,
}

impl Strategies {
    pub(crate) const fn for_platform(&self, platform: Platform) -> &Strategy {
        match platform {
            Platform::Vrbo => &self.vrbo,
            Platform::Airbnb => &self.airbnb,
            Platform::BookingCom => &self.booking_com,
            Platform::Unknown => &self.unknown,
        }
    }
}
