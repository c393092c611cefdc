use super::{Diagnostic, Severity};

pub fn render(d: &Diagnostic) -> String {
    let severity = match d.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };

    let labels: Vec<serde_json::Value> = d.labels.iter().map(|l| {
        let mut obj = serde_json::json!({
            "line": l.location.line,
            "col": l.location.column,
            "message": l.message,
            "primary": l.is_primary,
        });
        if l.location.len > 0 {
            obj["len"] = serde_json::Value::from(l.location.len);
        }
        obj
    }).collect();

    let mut obj = serde_json::json!({
        "severity": severity,
        "message": d.message,
        "labels": labels,
        "notes": d.notes,
    });

    if let Some(code) = d.code {
        obj["code"] = serde_json::Value::String(code.to_string());
    }

    if let Some(file) = &d.file {
        obj["file"] = serde_json::Value::String(file.clone());
    }

    if let Some(s) = &d.suggestion {
        obj["suggestion"] = serde_json::Value::String(s.clone());
    }

    serde_json::to_string(&obj).unwrap_or_else(|_| r#"{"severity":"error","message":"internal error serializing diagnostic"}"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Location;

    fn parse_json(s: &str) -> serde_json::Value {
        serde_json::from_str(s).expect("valid JSON")
    }

    #[test]
    fn render_basic_error() {
        let d = Diagnostic::error("division by zero").with_code("LBVM-R010");
        let v = parse_json(&render(&d));
        assert_eq!(v["severity"], "error");
        assert_eq!(v["message"], "division by zero");
        assert_eq!(v["code"], "LBVM-R010");
        assert!(v["labels"].as_array().unwrap().is_empty());
    }

    #[test]
    fn render_with_location() {
        let d = Diagnostic::error("bad operand")
            .with_location(Location { line: 4, column: 9, len: 0 }, "here")
            .with_file("fac.lbasm");
        let v = parse_json(&render(&d));
        let label = &v["labels"][0];
        assert_eq!(label["line"], 4);
        assert_eq!(label["col"], 9);
        assert_eq!(label["primary"], true);
        // zero length means "the token", so no explicit len
        assert!(label.get("len").is_none());
        assert_eq!(v["file"], "fac.lbasm");
    }

    #[test]
    fn render_with_notes_and_suggestion() {
        let d = Diagnostic::error("bad")
            .with_note("first")
            .with_note("second")
            .with_suggestion("try this instead");
        let v = parse_json(&render(&d));
        let notes = v["notes"].as_array().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0], "first");
        assert_eq!(v["suggestion"], "try this instead");
    }

    #[test]
    fn optional_keys_absent() {
        let v = parse_json(&render(&Diagnostic::error("bad")));
        assert!(v.get("suggestion").is_none());
        assert!(v.get("code").is_none());
        assert!(v.get("file").is_none());
    }

    #[test]
    fn secondary_label_is_not_primary() {
        let d = Diagnostic::error("label 'x' is defined more than once")
            .with_location(Location { line: 7, column: 1, len: 2 }, "redefined here")
            .with_secondary_location(Location { line: 2, column: 1, len: 2 }, "first defined here");
        let v = parse_json(&render(&d));
        assert_eq!(v["labels"][0]["len"], 2);
        assert_eq!(v["labels"][1]["primary"], false);
    }
}
