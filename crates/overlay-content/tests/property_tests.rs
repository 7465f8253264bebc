use overlay_content::{Anchor, Section, SectionDocument};
use proptest::prelude::*;
use semver::Version;

/// Free text that cannot collide with the marker grammar.
fn free_text() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-zA-Z0-9 .,#*]{0,30}", 0..8).prop_map(|lines| {
        let mut doc = lines.join("\n");
        if !doc.is_empty() {
            doc.push('\n');
        }
        doc
    })
}

fn section_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,10}"
}

fn body_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 \n]{0,60}"
}

proptest! {
    #[test]
    fn upsert_is_idempotent(doc in free_text(), name in section_name(), body in body_text()) {
        let section = Section::new(name, Version::new(1, 0, 0), body);

        let parsed = SectionDocument::parse(doc).unwrap();
        let (first, _) = parsed.upsert(&section, &Anchor::Auto).unwrap();

        let reparsed = SectionDocument::parse(first.clone()).unwrap();
        let (second, outcome) = reparsed.upsert(&section, &Anchor::Auto).unwrap();

        prop_assert_eq!(&second, &first);
        prop_assert_eq!(outcome, overlay_content::SectionOutcome::Unchanged);
    }

    #[test]
    fn upsert_preserves_marker_balance(doc in free_text(), name in section_name(), body in body_text()) {
        let section = Section::new(name.clone(), Version::new(1, 0, 0), body);

        let parsed = SectionDocument::parse(doc).unwrap();
        let (out, _) = parsed.upsert(&section, &Anchor::Auto).unwrap();

        // The result must parse, i.e. all begin/end pairs stay balanced
        let reparsed = SectionDocument::parse(out.clone()).unwrap();
        prop_assert!(reparsed.has_section(&name));

        let begins = out.matches(&format!("<!-- overlay:begin:{name} ")).count();
        let ends = out.matches(&format!("<!-- overlay:end:{name} -->")).count();
        prop_assert_eq!(begins, 1);
        prop_assert_eq!(ends, 1);
    }

    #[test]
    fn free_content_survives_insert_byte_for_byte(doc in free_text(), name in section_name(), body in body_text()) {
        let section = Section::new(name, Version::new(2, 0, 0), body);

        let parsed = SectionDocument::parse(doc.clone()).unwrap();
        let (out, _) = parsed.upsert(&section, &Anchor::End).unwrap();

        // Inserting at the end never rewrites anything before the insertion point
        prop_assert!(out.starts_with(&doc));
    }

    #[test]
    fn version_bump_then_remove_restores_free_regions(doc in free_text(), name in section_name(), body in body_text()) {
        let v1 = Section::new(name.clone(), Version::new(1, 0, 0), body.clone());
        let v2 = Section::new(name.clone(), Version::new(1, 1, 0), body);

        let parsed = SectionDocument::parse(doc).unwrap();
        let (inserted, _) = parsed.upsert(&v1, &Anchor::End).unwrap();

        let bumped_doc = SectionDocument::parse(inserted).unwrap();
        let (bumped, _) = bumped_doc.upsert(&v2, &Anchor::End).unwrap();

        let removed = SectionDocument::parse(bumped).unwrap().remove(&name).unwrap();
        prop_assert!(!removed.contains("overlay:begin"));
        prop_assert!(!removed.contains("overlay:end"));
    }
}
