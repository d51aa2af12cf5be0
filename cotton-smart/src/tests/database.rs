use super::*;

const SAMSUNG: &[&str] = &["type:ata", "model:Samsung SSD 860 EVO 1TB"];

#[test]
fn builtin_is_complete() {
    let db = Database::builtin();
    assert_eq!(db.entries().len(), 2);
    assert_eq!(db.entries()[0].name, "Default");
    assert_eq!(db.entries()[0].smart_attributes.len(), 79);
    assert_eq!(db.entries()[1].name, "Samsung SSDs");
    assert!(std::ptr::eq(db, Database::builtin()));
}

#[test]
fn default_always_matches_ata() {
    let m = get_matching_entries(&["type:ata"]);
    assert_eq!(m.len(), 1);
    assert_eq!(m[0].name, "Default");
}

#[test]
fn nvme_matches_nothing() {
    assert!(get_matching_entries(&["type:nvme", "model:Samsung SSD 860 EVO 1TB"])
        .is_empty());
    assert!(get_effective_table(&["type:nvme"]).is_empty());
}

#[test]
fn vendor_entry_after_default() {
    let m = get_matching_entries(SAMSUNG);
    let names: Vec<&str> = m.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Default", "Samsung SSDs"]);
}

#[test]
fn merge_keeps_both() {
    let t = get_effective_table(SAMSUNG);
    assert_eq!(t[&0xBE].unit, Unit::Celsius);
    assert_eq!(t[&0xBE].processor, Processor::HundredMinusValue);
    assert_eq!(t[&0xEB].unit, Unit::Count);
    assert_eq!(t[&0xEB].name, "POR_RECOVERY_COUNT");
}

#[test]
fn other_model_gets_default_only() {
    let t = get_effective_table(&["type:ata", "model:WDC WD40EFRX-68N32N0"]);
    assert!(t.contains_key(&0xBE));
    assert!(!t.contains_key(&0xEB));
    assert_eq!(t.len(), 79);
}

#[test]
fn pattern_needs_exact_filter_too() {
    assert!(get_matching_entries(&["model:Samsung SSD 850 EVO 2TB"]).is_empty());
}

#[test]
fn pattern_is_anchored_at_start_only() {
    let f = Filter::pattern("model:Samsung").unwrap();
    assert!(f.matches(&["model:Samsung SSD 860 EVO 1TB"]));
    assert!(!f.matches(&["xmodel:Samsung"]));
    assert!(f.matches(&["type:ata", "model:Samsung"]));
    assert!(!f.matches::<&str>(&[]));
}

#[test]
fn bad_pattern() {
    assert!(Filter::pattern("model:[").is_err());
}

fn celsius(id: u8) -> SmartAttribute {
    SmartAttribute::new(id, "TEMP", Unit::Celsius)
}

#[test]
fn last_writer_wins() {
    let db = Database::new(vec![
        DriveEntry::new("Default", vec![Filter::exact("type:ata")])
            .with_attributes([celsius(0xBE), celsius(0xC2)]),
        DriveEntry::new(
            "Acme",
            vec![Filter::exact("type:ata"), Filter::pattern("model:Acme").unwrap()],
        )
        .with_attributes([SmartAttribute::new(0xC2, "AIRFLOW", Unit::Unknown)]),
        DriveEntry::new("Never", vec![Filter::exact("type:scsi")])
            .with_attributes([SmartAttribute::new(0xBE, "NOPE", Unit::Count)]),
    ]);
    let t = db.effective_table(&["type:ata", "model:Acme 1"]);
    assert_eq!(t[&0xBE].name, "TEMP");
    assert_eq!(t[&0xC2].name, "AIRFLOW");
    assert_eq!(t[&0xC2].unit, Unit::Unknown);

    // shared entries untouched
    assert_eq!(db.entries()[0].smart_attributes[&0xC2].name, "TEMP");
}

#[test]
fn empty_filters_match_everything() {
    let db = Database::new(vec![DriveEntry::new("Any", vec![])]);
    assert_eq!(db.matching_entries::<&str>(&[]).len(), 1);
}

#[test]
fn export_view() {
    let v = Database::builtin().export();
    assert_eq!(v.len(), 2);
    assert_eq!(v[0].filters, vec!["type:ata".to_string()]);
    assert_eq!(
        v[1].filters,
        vec![
            "type:ata".to_string(),
            "model:Samsung SSD 8[56]0 EVO [12]TB".to_string()
        ]
    );
    assert_eq!(
        v[1].smart_attributes,
        vec![AttributeView {
            id: 0xEB,
            name: "POR_RECOVERY_COUNT",
            unit: Unit::Count
        }]
    );
}

#[test]
fn export_json() {
    let db = Database::new(vec![DriveEntry::new(
        "Default",
        vec![Filter::exact("type:ata")],
    )
    .with_attributes([SmartAttribute::new(9, "POWER_ON_HOURS", Unit::Hours)])
    .with_note("not exported")]);
    let j: serde_json::Value = serde_json::from_str(&db.to_json().unwrap()).unwrap();
    assert_eq!(
        j,
        serde_json::json!([{
            "name": "Default",
            "filters": ["type:ata"],
            "smart_attributes": [{"id": 9, "name": "POWER_ON_HOURS", "unit": "HOURS"}]
        }])
    );
}

#[test]
fn builtin_json_spellings() {
    let j = Database::builtin().to_json().unwrap();
    assert!(j.contains("\"CELSIUS\""));
    assert!(j.contains("\"MILLISECONDS\""));
    assert!(j.contains("\"UNKNOWN\""));
    assert!(j.contains("\"COUNT\""));
}

#[test]
fn concurrent_readers() {
    let handles: Vec<_> = (0..4)
        .map(|_| std::thread::spawn(|| get_effective_table(SAMSUNG).len()))
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 80);
    }
}
