//! End-to-end scenarios across normalize → expand → aggregate.

use calendar_marks::{
    aggregate, guard, normalize_times, CalendarConfig, CalendarPipeline, DateWindow, DayMarks, Dot,
    Event, EventTime, GuardDecision, LocalClock, MarkedDateMap, RRuleEngine, RecurrenceExpander,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

fn naive(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
}

fn load(json: &str) -> Vec<Event> {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_single_event_end_to_end() {
    let events = load(
        r#"[{"id": "e1", "start": "2024-03-10T15:00:00Z", "end": "2024-03-10T16:00:00Z"}]"#,
    );
    let clock = LocalClock::utc(now());
    let normalized = normalize_times(&events, &clock);

    let expander = RecurrenceExpander::new(RRuleEngine::default(), CalendarConfig::default());
    let occurrences = expander.expand(
        &normalized,
        naive("2024-03-01T00:00:00"),
        naive("2024-03-31T00:00:00"),
        clock.now,
    );
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].id, "e1");

    let marks = aggregate(&occurrences, true, &CalendarConfig::default());
    let mut expected = MarkedDateMap::new();
    expected.insert(
        "2024-03-10".to_string(),
        DayMarks {
            marked: true,
            dots: vec![Dot {
                color: "#0D47A1".to_string(),
            }],
            events: vec![occurrences[0].clone()],
        },
    );
    assert_eq!(marks, expected);
}

#[test]
fn test_weekly_exclusion_end_to_end() {
    // Four Sundays, the third excluded.
    let events = load(
        r#"[{
            "id": "w1",
            "title": "Sunday service",
            "start": "2024-03-03T10:00:00Z",
            "end": "2024-03-03T11:30:00Z",
            "recurrenceRule": "FREQ=WEEKLY;BYDAY=SU;COUNT=4",
            "excludeDates": ["2024-03-17"]
        }]"#,
    );
    let pipeline = CalendarPipeline::with_defaults();
    let window = DateWindow::for_month("2024-03").unwrap();
    let occurrences = pipeline.occurrences(&events, &window, &LocalClock::utc(now()));

    assert_eq!(occurrences.len(), 3);
    let days: Vec<_> = occurrences.iter().map(|o| o.date_key()).collect();
    assert_eq!(days, vec!["2024-03-03", "2024-03-10", "2024-03-24"]);
    assert!(occurrences
        .iter()
        .all(|o| o.end - o.start == chrono::Duration::minutes(90)));
}

#[test]
fn test_unreadable_exclusion_isolated_to_its_event() {
    let events = load(
        r#"[
            {"id": "bad", "start": "2024-03-04T09:00:00Z", "end": "2024-03-04T10:00:00Z",
             "recurrenceRule": "FREQ=WEEKLY;COUNT=2", "excludeDates": ["someday"]},
            {"id": "good", "start": "2024-03-03T10:00:00Z", "end": "2024-03-03T11:30:00Z",
             "recurrenceRule": "FREQ=WEEKLY;COUNT=4", "excludeDates": ["2024-03-17"]}
        ]"#,
    );
    let pipeline = CalendarPipeline::with_defaults();
    let window = DateWindow::for_month("2024-03").unwrap();
    let occurrences = pipeline.occurrences(&events, &window, &LocalClock::utc(now()));

    let good: Vec<_> = occurrences
        .iter()
        .filter(|o| o.id == "good")
        .map(|o| o.date_key())
        .collect();
    assert_eq!(good, vec!["2024-03-03", "2024-03-10", "2024-03-24"]);
}

#[test]
fn test_floating_until_expands_series() {
    let events = load(
        r#"[{
            "id": "f1",
            "start": "2024-03-03T10:00:00Z",
            "end": "2024-03-03T11:00:00Z",
            "recurrenceRule": "FREQ=WEEKLY;UNTIL=20240401T000000"
        }]"#,
    );
    let pipeline = CalendarPipeline::with_defaults();
    let window = DateWindow::for_month("2024-03").unwrap();
    let occurrences = pipeline.occurrences(&events, &window, &LocalClock::utc(now()));
    assert_eq!(occurrences.len(), 5);
}

#[test]
fn test_unstable_rule_shows_once() {
    let events = load(
        r#"[{
            "id": "d1",
            "start": "2024-02-20T07:00:00Z",
            "end": "2024-02-20T07:30:00Z",
            "recurrenceRule": "FREQ=DAILY;BYDAY=MO,WE,FR"
        }]"#,
    );
    let pipeline = CalendarPipeline::with_defaults();
    let window = DateWindow::for_month("2024-03").unwrap();
    let occurrences = pipeline.occurrences(&events, &window, &LocalClock::utc(now()));
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].start, naive("2024-02-20T07:00:00"));
}

#[test]
fn test_pathological_rule_falls_back() {
    // Hourly for a month produces far more than fifty candidates.
    let events = load(
        r#"[{
            "id": "h1",
            "start": "2024-03-01T00:00:00Z",
            "end": "2024-03-01T00:15:00Z",
            "recurrenceRule": "FREQ=HOURLY;COUNT=5000"
        }]"#,
    );
    let pipeline = CalendarPipeline::with_defaults();
    let window = DateWindow::for_month("2024-03").unwrap();
    let occurrences = pipeline.occurrences(&events, &window, &LocalClock::utc(now()));
    assert_eq!(occurrences.len(), 1);
}

#[test]
fn test_malformed_events_do_not_poison_batch() {
    let events = load(
        r#"[
            {"id": "bad-start", "start": "not a date", "end": "2024-03-10T16:00:00Z"},
            {"id": "bad-rule", "start": "2024-03-05T10:00:00Z", "end": "2024-03-05T11:00:00Z",
             "recurrenceRule": "FREQ=FORTNIGHTLY;COUNT=2"},
            {"id": "ok", "start": "2024-03-12T18:00:00Z", "end": "2024-03-12T19:00:00Z"}
        ]"#,
    );
    let marks = CalendarPipeline::with_defaults().run_for_month(
        &events,
        "2024-03-01",
        true,
        &LocalClock::utc(now()),
    );
    // The unparsable rule degrades to its single instance; the bad start is dropped.
    assert_eq!(marks.len(), 2);
    assert_eq!(marks["2024-03-05"].events[0].id, "bad-rule");
    assert_eq!(marks["2024-03-12"].events[0].id, "ok");
}

#[test]
fn test_guard_literals() {
    assert!(matches!(
        guard("FREQ=DAILY;BYDAY=MO,WE,FR", now()),
        GuardDecision::Single(_)
    ));

    let GuardDecision::Expand {
        adjusted_rule: Some(rule),
    } = guard("FREQ=WEEKLY;BYDAY=MO", now())
    else {
        panic!("expected an adjusted rule");
    };
    let expected_until = (now() + chrono::Duration::days(90))
        .format("%Y%m%dT%H%M%SZ")
        .to_string();
    assert_eq!(rule, format!("FREQ=WEEKLY;BYDAY=MO;UNTIL={expected_until}"));
}

#[test]
fn test_config_from_json_drives_pipeline() {
    let config = CalendarConfig::from_json(r##"{"markerColor": "#AD1457", "maxMarkedOccurrences": 1}"##)
        .unwrap();
    let pipeline = CalendarPipeline::new(RRuleEngine::default(), config);
    let events = vec![
        Event {
            id: "a".to_string(),
            start: Some(EventTime::parse("2024-03-10T15:00:00Z")),
            end: Some(EventTime::parse("2024-03-10T16:00:00Z")),
            ..Event::default()
        },
        Event {
            id: "b".to_string(),
            start: Some(EventTime::parse("2024-03-11T15:00:00Z")),
            end: Some(EventTime::parse("2024-03-11T16:00:00Z")),
            ..Event::default()
        },
    ];
    let marks = pipeline.run_for_month(&events, "2024-03", true, &LocalClock::utc(now()));
    assert_eq!(marks.len(), 1);
    assert_eq!(marks["2024-03-10"].dots[0].color, "#AD1457");
}
