//! Package descriptor (`package.xml`) generation

use std::collections::BTreeMap;

pub const METADATA_NAMESPACE: &str = "http://soap.sforce.com/2006/04/metadata";

/// Render a `package.xml` listing `items` (metadata type to member names).
///
/// Types and members are sorted. No trailing newline is written.
pub fn package_xml_from_dict(
    items: &BTreeMap<String, Vec<String>>,
    api_version: &str,
    package_name: Option<&str>,
) -> String {
    let mut lines = vec![
        r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
        format!(r#"<Package xmlns="{METADATA_NAMESPACE}">"#),
    ];

    if let Some(name) = package_name.filter(|n| !n.is_empty()) {
        lines.push(format!("    <fullName>{}</fullName>", escape_text(name)));
    }

    for (md_type, members) in items {
        let mut members: Vec<&String> = members.iter().collect();
        members.sort();
        lines.push("    <types>".to_string());
        for member in members {
            lines.push(format!("        <members>{}</members>", escape_text(member)));
        }
        lines.push(format!("        <name>{}</name>", escape_text(md_type)));
        lines.push("    </types>".to_string());
    }

    lines.push(format!("    <version>{}</version>", escape_text(api_version)));
    lines.push("</Package>".to_string());
    lines.join("\n")
}

fn escape_text(text: &str) -> std::borrow::Cow<'_, str> {
    quick_xml::escape::escape(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_xml_from_dict() {
        let mut items = BTreeMap::new();
        items.insert("ApexClass".to_string(), vec!["TestClass".to_string()]);
        let result = package_xml_from_dict(&items, "43.0", Some("TestPackage"));
        assert_eq!(
            result,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Package xmlns="http://soap.sforce.com/2006/04/metadata">
    <fullName>TestPackage</fullName>
    <types>
        <members>TestClass</members>
        <name>ApexClass</name>
    </types>
    <version>43.0</version>
</Package>"#
        );
    }

    #[test]
    fn test_sorted_and_unnamed() {
        let mut items = BTreeMap::new();
        items.insert("CustomObject".to_string(), vec!["Zeta__c".to_string(), "Alpha__c".to_string()]);
        items.insert("ApexClass".to_string(), vec!["A&B".to_string()]);
        let result = package_xml_from_dict(&items, "58.0", None);
        assert!(!result.contains("fullName"));
        let apex = result.find("<name>ApexClass</name>").unwrap();
        let object = result.find("<name>CustomObject</name>").unwrap();
        assert!(apex < object);
        assert!(result.find("Alpha__c").unwrap() < result.find("Zeta__c").unwrap());
        assert!(result.contains("<members>A&amp;B</members>"));
    }
}
