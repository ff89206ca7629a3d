use booking_extract::*;
use chrono::{FixedOffset, TimeZone, Utc};

const MINIMAL_CONFIG: &str = r#"
default_timezone = "+02:00"

[platforms.vrbo]
sender_domains = ["vrbo.com"]
subject_patterns = ['(?i)\bvrbo\b']
date_formats = ["%m/%d/%Y"]

[[platforms.vrbo.rules]]
field = "reservation_id"
matcher = { kind = "pattern", pattern = 'Reservation #: ([A-Z0-9]+)' }

[[platforms.vrbo.rules]]
field = "guest_name"
matcher = { kind = "label", labels = ["Guest"] }

[[platforms.vrbo.rules]]
field = "check_in_date"
matcher = { kind = "pattern", pattern = 'Check-in: (\S+)' }

[[platforms.vrbo.rules]]
field = "total_amount"
post = "amount"
matcher = { kind = "pattern", pattern = 'Total: (.+)' }

[platforms.airbnb]
sender_domains = ["airbnb.com"]

[platforms.booking_com]
sender_domains = ["booking.com"]

[platforms.unknown]
"#;

#[test]
fn test_default_config_compiles() {
    let config = ParserConfig::default().compile().unwrap();

    assert_eq!(config.default_offset(), FixedOffset::east_opt(0).unwrap());
    for platform in Platform::ALL {
        assert_eq!(config.strategy(platform).platform(), platform);
        assert!(!config.strategy(platform).rules().is_empty());
    }
}

#[test]
fn test_load_from_toml() {
    let config = ParserConfig::from_toml_str(MINIMAL_CONFIG).unwrap();

    assert_eq!(config.default_timezone, "+02:00");
    let vrbo = config.platforms.get(Platform::Vrbo).unwrap();
    assert_eq!(vrbo.rules.len(), 4);
    assert_eq!(vrbo.collect_all, vec![Field::TotalAmount]);
    assert_eq!(vrbo.rules[0].post, PostProcessor::Trim);
    assert_eq!(
        vrbo.rules[1].matcher,
        Matcher::Label {
            labels: vec!["Guest".into()]
        }
    );
    assert!(config.platforms.get(Platform::Unknown).unwrap().rules.is_empty());
}

#[test]
fn test_loaded_config_drives_the_pipeline() {
    let compiled = ParserConfig::from_toml_str(MINIMAL_CONFIG)
        .unwrap()
        .compile()
        .unwrap();
    let pipeline = Pipeline::new(compiled);

    let email = EmailData::new(
        "msg-1",
        "Hello",
        "noreply@vrbo.com",
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
    )
    .with_text("Reservation #: VR12345\nGuest\nJane Doe\nCheck-in: 07/01/2024\nTotal: €80");

    let outcome = pipeline.process(&email);
    let booking = outcome.booking().unwrap();
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();

    assert_eq!(booking.reservation_id, "VR12345");
    assert_eq!(booking.guest_name, "Jane Doe");
    assert_eq!(
        booking.check_in_date,
        Some(offset.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap())
    );
    assert_eq!(booking.total_amount, Some(80.0));
    assert_eq!(booking.currency.as_deref(), Some("EUR"));
}

#[test]
fn test_config_serde_round_trip() {
    let config = ParserConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let back: ParserConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_invalid_toml() {
    let result = ParserConfig::from_toml_str("default_timezone = ");
    assert!(matches!(result, Err(Error::Config(_))));
}

// --- Fail-loud validation ---

#[test]
fn test_missing_known_platform_table() {
    let mut config = ParserConfig::default();
    config.platforms.airbnb = None;

    let result = config.compile();
    assert!(matches!(result, Err(Error::MissingStrategy(Platform::Airbnb))));
}

#[test]
fn test_missing_unknown_table() {
    let mut config = ParserConfig::default();
    config.platforms.unknown = None;

    let result = config.compile();
    assert!(matches!(result, Err(Error::MissingStrategy(Platform::Unknown))));
}

#[test]
fn test_invalid_rule_pattern() {
    let mut config = ParserConfig::default();
    config
        .platforms
        .get_mut(Platform::Vrbo)
        .unwrap()
        .rules
        .push(RuleConfig::pattern(Field::GuestName, "Guest: (unclosed", PostProcessor::Trim));

    let result = config.compile();
    assert!(matches!(
        result,
        Err(Error::InvalidPattern {
            platform: Platform::Vrbo,
            ..
        })
    ));
}

#[test]
fn test_invalid_subject_pattern() {
    let mut config = ParserConfig::default();
    config
        .platforms
        .get_mut(Platform::BookingCom)
        .unwrap()
        .subject_patterns
        .push("[booking".into());

    let result = config.compile();
    assert!(matches!(
        result,
        Err(Error::InvalidPattern {
            platform: Platform::BookingCom,
            ..
        })
    ));
}

#[test]
fn test_invalid_timezone() {
    let config = ParserConfig {
        default_timezone: "Mars/Olympus".into(),
        ..ParserConfig::default()
    };

    let result = config.compile();
    assert!(matches!(result, Err(Error::InvalidTimezone(ref tz)) if tz == "Mars/Olympus"));
}

#[test]
fn test_invalid_date_format() {
    let mut config = ParserConfig::default();
    config
        .platforms
        .get_mut(Platform::Airbnb)
        .unwrap()
        .date_formats
        .push("%Y-%!-%d".into());

    let result = config.compile();
    assert!(matches!(
        result,
        Err(Error::InvalidDateFormat {
            platform: Platform::Airbnb,
            ..
        })
    ));
}

#[test]
fn test_rule_cannot_target_platform_field() {
    let mut config = ParserConfig::default();
    config
        .platforms
        .get_mut(Platform::Vrbo)
        .unwrap()
        .rules
        .push(RuleConfig::pattern(Field::Platform, "(vrbo)", PostProcessor::Trim));

    let result = config.compile();
    assert!(matches!(
        result,
        Err(Error::UnextractableField {
            field: Field::Platform,
            ..
        })
    ));
}

#[test]
fn test_label_rule_without_labels() {
    let mut config = ParserConfig::default();
    config
        .platforms
        .get_mut(Platform::Unknown)
        .unwrap()
        .rules
        .push(RuleConfig::label(Field::GuestName, &[" "], PostProcessor::Trim));

    let result = config.compile();
    assert!(matches!(
        result,
        Err(Error::EmptyLabels {
            platform: Platform::Unknown,
            ..
        })
    ));
}

#[test]
fn test_range_rule_needs_date_fields() {
    let mut config = ParserConfig::default();
    config.platforms.get_mut(Platform::Vrbo).unwrap().rules.push(RuleConfig::subject_range(
        Field::CheckInDate,
        Field::GuestName,
        r"(\w+ \d+) - (\w+ \d+)",
        PostProcessor::Trim,
    ));

    let result = config.compile();
    assert!(matches!(
        result,
        Err(Error::InvalidRange {
            platform: Platform::Vrbo,
            field: Field::CheckInDate,
            ..
        })
    ));
}

#[test]
fn test_range_rule_needs_two_groups() {
    let mut config = ParserConfig::default();
    config.platforms.get_mut(Platform::Airbnb).unwrap().rules.push(RuleConfig::subject_range(
        Field::CheckInDate,
        Field::CheckOutDate,
        r"(\w+ \d+) - \w+ \d+",
        PostProcessor::Trim,
    ));

    let result = config.compile();
    assert!(matches!(
        result,
        Err(Error::InvalidRange {
            platform: Platform::Airbnb,
            ..
        })
    ));
}

#[test]
fn test_date_pair_rule_from_toml() {
    let toml = r#"
[platforms.vrbo]
sender_domains = ["vrbo.com"]
date_formats = ["%d.%m.%Y"]

[[platforms.vrbo.rules]]
field = "check_in_date"
matcher = { kind = "date_pair", pattern = '(\d{2}\.\d{2}\.\d{4})', end_field = "check_out_date" }

[platforms.airbnb]
[platforms.booking_com]
[platforms.unknown]
"#;
    let config = ParserConfig::from_toml_str(toml).unwrap();
    assert_eq!(
        config.platforms.get(Platform::Vrbo).unwrap().rules[0].matcher.end_field(),
        Some(Field::CheckOutDate)
    );

    let compiled = config.compile().unwrap();
    let fields = compiled
        .strategy(Platform::Vrbo)
        .extract("", &normalize("Stay 01.07.2024 until 05.07.2024", ""));

    assert_eq!(fields.value(Field::CheckInDate), Some("01.07.2024"));
    assert_eq!(fields.value(Field::CheckOutDate), Some("05.07.2024"));
}
