use booking_extract::*;
use test_case::test_case;

fn extract(platform: Platform, subject: &str, text: &str, html: &str) -> RawFieldSet {
    let config = ParserConfig::default().compile().unwrap();
    config
        .strategy(platform)
        .extract(subject, &normalize(text, html))
}

fn candidate(raw: &str, origin: MatchOrigin, position: usize) -> RawMatch {
    RawMatch {
        value: raw.to_string(),
        raw: raw.to_string(),
        origin,
        position,
    }
}

// --- Platform rules ---

#[test]
fn test_vrbo_labeled_fields() {
    let fields = extract(
        Platform::Vrbo,
        "Your reservation is confirmed",
        "Reservation #: VR12345\nGuest: Jane Doe\nCheck-in: 07/01/2024\nCheck-out: 07/05/2024\n\
         Phone: +1 (555) 123-4567\nEmail: jane@example.com\nGuests: 4",
        "",
    );

    assert_eq!(fields.value(Field::ReservationId), Some("VR12345"));
    assert_eq!(fields.value(Field::GuestName), Some("Jane Doe"));
    assert_eq!(fields.value(Field::CheckInDate), Some("07/01/2024"));
    assert_eq!(fields.value(Field::CheckOutDate), Some("07/05/2024"));
    assert_eq!(fields.value(Field::GuestPhone), Some("+1 (555) 123-4567"));
    assert_eq!(fields.value(Field::GuestEmail), Some("jane@example.com"));
    assert_eq!(fields.value(Field::NumberOfGuests), Some("4"));
    assert!(fields.ambiguous_fields().next().is_none());
}

#[test]
fn test_vrbo_reservation_from_subject() {
    let fields = extract(
        Platform::Vrbo,
        "Instant Booking from Jane Doe: Jul 1 - Jul 5, 2024 - Vrbo #4567890",
        "Your guest is on the way.",
        "",
    );

    assert_eq!(fields.value(Field::ReservationId), Some("4567890"));
    assert_eq!(fields.get(Field::ReservationId).unwrap().origin, MatchOrigin::Subject);
    assert_eq!(fields.value(Field::GuestName), Some("Jane Doe"));
}

#[test]
fn test_airbnb_subject_and_body() {
    let fields = extract(
        Platform::Airbnb,
        "Reservation confirmed - Jane Doe arrives Jul 5",
        "Confirmation code: HMABCD1234\nCheck-in: Fri, Jul 5, 2024\nCheckout: Mon, Jul 8, 2024\n2 guests",
        "",
    );

    assert_eq!(fields.value(Field::ReservationId), Some("HMABCD1234"));
    assert_eq!(fields.value(Field::GuestName), Some("Jane Doe"));
    assert_eq!(fields.value(Field::CheckInDate), Some("Fri, Jul 5, 2024"));
    assert_eq!(fields.value(Field::CheckOutDate), Some("Mon, Jul 8, 2024"));
    assert_eq!(fields.value(Field::NumberOfGuests), Some("2"));
}

#[test]
fn test_vrbo_stay_dates_from_subject_range() {
    let fields = extract(
        Platform::Vrbo,
        "Instant Booking from Jane Doe: Jul 1 - Jul 5, 2024 - Vrbo #4567890",
        "Your guest is on the way.",
        "",
    );

    assert_eq!(fields.value(Field::CheckInDate), Some("Jul 1, 2024"));
    assert_eq!(fields.value(Field::CheckOutDate), Some("Jul 5, 2024"));
    let check_in = fields.get(Field::CheckInDate).unwrap();
    assert_eq!(check_in.origin, MatchOrigin::Subject);
    assert_eq!(check_in.raw, "Jul 1, 2024");
}

#[test]
fn test_vrbo_subject_range_across_years() {
    let fields = extract(
        Platform::Vrbo,
        "Booking from Jane Doe: Dec 30, 2024 - Jan 2, 2025 - Vrbo #4567890",
        "Your guest is on the way.",
        "",
    );

    assert_eq!(fields.value(Field::CheckInDate), Some("Dec 30, 2024"));
    assert_eq!(fields.value(Field::CheckOutDate), Some("Jan 2, 2025"));
}

#[test]
fn test_labeled_dates_beat_subject_range() {
    let fields = extract(
        Platform::Vrbo,
        "Instant Booking from Jane Doe: Jul 1 - Jul 5, 2024 - Vrbo #4567890",
        "Check-in: 07/02/2024\nCheck-out: 07/06/2024",
        "",
    );

    assert_eq!(fields.value(Field::CheckInDate), Some("07/02/2024"));
    assert_eq!(fields.value(Field::CheckOutDate), Some("07/06/2024"));
    assert!(!fields.is_ambiguous(Field::CheckInDate));
    assert!(!fields.is_ambiguous(Field::CheckOutDate));
}

#[test]
fn test_unlabeled_body_dates_fill_stay() {
    let fields = extract(
        Platform::Airbnb,
        "",
        "Your trip: Jul 5, 2024 to Jul 8, 2024\nSee you soon",
        "",
    );

    assert_eq!(fields.value(Field::CheckInDate), Some("Jul 5, 2024"));
    assert_eq!(fields.value(Field::CheckOutDate), Some("Jul 8, 2024"));
    assert_eq!(fields.get(Field::CheckOutDate).unwrap().origin, MatchOrigin::Body);
}

#[test]
fn test_single_unlabeled_date_is_not_a_stay() {
    let fields = extract(Platform::Airbnb, "", "Your trip starts Jul 5, 2024", "");

    assert_eq!(fields.value(Field::CheckInDate), None);
    assert_eq!(fields.value(Field::CheckOutDate), None);
}

#[test]
fn test_airbnb_uppercase_subject_words_are_not_codes() {
    let fields = extract(
        Platform::Airbnb,
        "RESERVATION CONFIRMED - Jane Doe arrives Jul 5",
        "Your guest is on the way.",
        "",
    );

    assert_eq!(fields.value(Field::ReservationId), None);
    assert_eq!(fields.value(Field::GuestName), Some("Jane Doe"));

    let fields = extract(
        Platform::Airbnb,
        "RESERVATION CONFIRMED - Jane Doe arrives Jul 5",
        "Confirmation code: HMABCD1234",
        "",
    );
    assert_eq!(fields.value(Field::ReservationId), Some("HMABCD1234"));
    assert!(!fields.is_ambiguous(Field::ReservationId));
}

#[test]
fn test_booking_com_cell_keeps_lettered_id() {
    let html = "<table>\
                <tr><td>Booking number</td><td>ABC-123</td></tr>\
                </table>";
    let fields = extract(Platform::BookingCom, "", "", html);
    assert_eq!(fields.value(Field::ReservationId), Some("ABC-123"));

    let html = "<table>\
                <tr><td>Booking number</td><td>4021.331.554</td></tr>\
                </table>";
    let fields = extract(Platform::BookingCom, "", "", html);
    assert_eq!(fields.value(Field::ReservationId), Some("4021331554"));
}

#[test]
fn test_booking_com_dotted_number() {
    let fields = extract(
        Platform::BookingCom,
        "Booking confirmation",
        "Booking number: 4021.331.554\nGuest name: Hans Müller\nCheck-in: Friday, 5 July 2024",
        "",
    );

    assert_eq!(fields.value(Field::ReservationId), Some("4021331554"));
    assert_eq!(fields.get(Field::ReservationId).unwrap().raw, "4021.331.554");
    assert!(!fields.is_ambiguous(Field::ReservationId));
    assert_eq!(fields.value(Field::GuestName), Some("Hans Müller"));
    assert_eq!(fields.value(Field::CheckInDate), Some("Friday, 5 July 2024"));
}

#[test]
fn test_unknown_platform_extracts_ids_and_dates_only() {
    let fields = extract(
        Platform::Unknown,
        "Your stay",
        "Booking code: ABC12345\nGuest: Jane Doe\nArrival: 2024-07-01\nDeparture: 2024-07-03",
        "",
    );

    assert_eq!(fields.value(Field::ReservationId), Some("ABC12345"));
    assert_eq!(fields.value(Field::CheckInDate), Some("2024-07-01"));
    assert_eq!(fields.value(Field::CheckOutDate), Some("2024-07-03"));
    assert_eq!(fields.value(Field::GuestName), None);
}

// --- Label and cell matchers ---

#[test]
fn test_label_value_on_next_line() {
    let fields = extract(
        Platform::Vrbo,
        "",
        "Guest\nJane Doe\nProperty\nOcean View Cottage",
        "",
    );

    assert_eq!(fields.value(Field::GuestName), Some("Jane Doe"));
    assert_eq!(fields.value(Field::PropertyName), Some("Ocean View Cottage"));
}

#[test]
fn test_label_needs_separator() {
    let fields = extract(Platform::Vrbo, "", "Property ID: 334455\nGuests: 3", "");

    assert_eq!(fields.value(Field::PropertyId), Some("334455"));
    assert_eq!(fields.value(Field::PropertyName), None);
    assert_eq!(fields.value(Field::GuestName), None);
}

#[test]
fn test_cell_rules_read_tables() {
    let html = "<html><body><table>\
                <tr><td>Reservation ID</td><td>VR77777</td></tr>\
                <tr><td>Guest name</td><td>John Smith</td></tr>\
                <tr><td>Check-in</td><td>2024-08-10</td></tr>\
                <tr><td>Check-out</td><td>2024-08-12</td></tr>\
                </table></body></html>";
    let fields = extract(Platform::Vrbo, "Reservation", "", html);

    assert_eq!(fields.value(Field::ReservationId), Some("VR77777"));
    assert_eq!(fields.get(Field::ReservationId).unwrap().origin, MatchOrigin::Table);
    assert_eq!(fields.value(Field::GuestName), Some("John Smith"));
    assert_eq!(fields.value(Field::CheckInDate), Some("2024-08-10"));
    assert_eq!(fields.value(Field::CheckOutDate), Some("2024-08-12"));
}

// --- Ambiguity and audit data ---

#[test]
fn test_conflicting_matches_are_flagged() {
    let fields = extract(
        Platform::Vrbo,
        "",
        "Reservation #: VR11111\nGuest: Jane Doe\nConfirmation number: VR22222",
        "",
    );

    assert_eq!(fields.value(Field::ReservationId), Some("VR11111"));
    assert!(fields.is_ambiguous(Field::ReservationId));
    assert!(!fields.is_ambiguous(Field::GuestName));

    let raw = fields.to_raw_data();
    assert_eq!(raw["reservation_id"], "VR11111");
    assert_eq!(raw["ambiguous_fields"], serde_json::json!(["reservation_id"]));
}

// --- Amounts and currency ---

#[test]
fn test_currency_adjacent_amount_beats_later_bare_amount() {
    let fields = extract(
        Platform::Vrbo,
        "",
        "Subtotal: 400.00\nTotal: $450.00\nTotal payout: 420.00",
        "",
    );

    assert_eq!(fields.value(Field::TotalAmount), Some("450.00"));
    assert_eq!(fields.candidates(Field::TotalAmount).len(), 3);
    assert!(fields.is_ambiguous(Field::TotalAmount));
    assert_eq!(fields.value(Field::Currency), Some("USD"));

    let raw = fields.to_raw_data();
    assert_eq!(
        raw["total_amount_candidates"],
        serde_json::json!(["400.00", "$450.00", "420.00"])
    );
}

#[test]
fn test_last_bare_amount_wins() {
    let fields = extract(
        Platform::Airbnb,
        "",
        "Subtotal: 400\nTotal: 450\nTotal paid: 475",
        "",
    );

    assert_eq!(fields.value(Field::TotalAmount), Some("475"));
    assert_eq!(fields.value(Field::Currency), None);
}

#[test]
fn test_last_currency_adjacent_amount_wins() {
    let fields = extract(
        Platform::BookingCom,
        "",
        "Subtotal: € 500.00\nTaxes included\nTotal: € 540.00\nTotal charged: 12",
        "",
    );

    assert_eq!(fields.value(Field::TotalAmount), Some("540.00"));
    assert_eq!(fields.value(Field::Currency), Some("EUR"));
}

#[test]
fn test_explicit_currency_beats_derived() {
    let fields = extract(Platform::Airbnb, "", "Total (eur): $300.00", "");

    assert_eq!(fields.value(Field::TotalAmount), Some("300.00"));
    assert_eq!(fields.value(Field::Currency), Some("EUR"));
}

#[test]
fn test_amount_grouping_and_sign() {
    let fields = extract(Platform::Vrbo, "", "Total: -USD 1,250.50", "");
    assert_eq!(fields.value(Field::TotalAmount), Some("-1250.50"));
    assert_eq!(fields.value(Field::Currency), Some("USD"));
}

#[test_case("Total: €120,50", "120.50", Some("EUR") ; "decimal comma")]
#[test_case("Total: 1.234,56 EUR", "1234.56", Some("EUR") ; "dot grouping")]
#[test_case("Total: $1,234.56", "1234.56", Some("USD") ; "comma grouping")]
#[test_case("Total: 2.500 GBP", "2500", Some("GBP") ; "lone grouping dot")]
#[test_case("Total: 1,234.56 VAT", "1234.56", None ; "stray capitals")]
fn test_amount_separators(line: &str, amount: &str, currency: Option<&str>) {
    let fields = extract(Platform::BookingCom, "", line, "");

    assert_eq!(fields.value(Field::TotalAmount), Some(amount));
    assert_eq!(fields.value(Field::Currency), currency);
}

#[test]
fn test_ambiguous_separators_are_kept_as_written() {
    let fields = extract(Platform::BookingCom, "", "Total: €1.234.56", "");

    assert_eq!(fields.value(Field::TotalAmount), Some("1.234.56"));
    assert_eq!(fields.value(Field::Currency), Some("EUR"));
}

#[test]
fn test_table_amount_with_trailing_text() {
    let html = "<table>\
                <tr><td>Total</td><td>€ 1.234,56 incl. VAT</td></tr>\
                </table>";
    let fields = extract(Platform::BookingCom, "", "", html);

    assert_eq!(fields.value(Field::TotalAmount), Some("1234.56"));
    assert_eq!(fields.value(Field::Currency), Some("EUR"));
}

#[test]
fn test_dash_after_amount_is_not_a_sign() {
    let html = "<table>\
                <tr><td>Total</td><td>€ 80.00 (2-night minimum)</td></tr>\
                </table>";
    let fields = extract(Platform::BookingCom, "", "", html);

    assert_eq!(fields.value(Field::TotalAmount), Some("80.00"));
}

#[test]
fn test_pick_amount_order() {
    let candidates = vec![
        candidate("100", MatchOrigin::Body, 5),
        candidate("$120", MatchOrigin::Body, 20),
        candidate("150", MatchOrigin::Table, 0),
        candidate("€130", MatchOrigin::Body, 40),
    ];

    let winner = pick_amount(&candidates).unwrap();
    assert_eq!(winner.raw, "€130");

    let bare = &candidates[..1];
    assert_eq!(pick_amount(bare).unwrap().raw, "100");
    assert!(pick_amount(&[]).is_none());
}

#[test]
fn test_currency_marker() {
    assert_eq!(currency_marker("$45.00").as_deref(), Some("USD"));
    assert_eq!(currency_marker("€ 10").as_deref(), Some("EUR"));
    assert_eq!(currency_marker("£99").as_deref(), Some("GBP"));
    assert_eq!(currency_marker("120 CAD").as_deref(), Some("CAD"));
    assert_eq!(currency_marker("chf").as_deref(), Some("CHF"));
    assert_eq!(currency_marker("450.00"), None);
    assert_eq!(currency_marker("€ 1.234,56 incl. VAT").as_deref(), Some("EUR"));
    assert_eq!(currency_marker("1,234.56 VAT"), None);
    assert_eq!(currency_marker("NET 45"), None);
    assert_eq!(currency_marker("-USD 5").as_deref(), Some("USD"));
}
