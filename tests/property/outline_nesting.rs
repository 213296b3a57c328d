//! Outline parsing keeps every heading, in order, nested by depth

use docket::entity::{parse_outline, EntityTree};
use docket::frontmatter::DocketFrontmatter;
use docket::status::StatusMap;
use proptest::prelude::*;

fn outline(levels: &[u8]) -> String {
    levels
        .iter()
        .enumerate()
        .map(|(i, level)| format!("{} N{} \u{2014} Title {}\nOrder:: {}\n", "#".repeat(*level as usize), i, i, i))
        .collect()
}

fn preorder<'a>(trees: &'a [EntityTree], out: &mut Vec<&'a str>) {
    for tree in trees {
        out.push(tree.entity.name.as_str());
        preorder(&tree.children, out);
    }
}

fn children_are_deeper(tree: &EntityTree) -> bool {
    tree.children.iter().all(|child| {
        child.entity.heading_level > tree.entity.heading_level && children_are_deeper(child)
    })
}

proptest! {
    #[test]
    fn every_heading_appears_once_in_document_order(levels in prop::collection::vec(1u8..=6, 0..24)) {
        let trees = parse_outline(&outline(&levels), &DocketFrontmatter::default(), &StatusMap::default());

        let mut names = Vec::new();
        preorder(&trees, &mut names);
        let expected: Vec<String> = (0..levels.len()).map(|i| format!("N{}", i)).collect();
        prop_assert_eq!(names, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn children_are_strictly_deeper(levels in prop::collection::vec(1u8..=6, 1..24)) {
        let trees = parse_outline(&outline(&levels), &DocketFrontmatter::default(), &StatusMap::default());
        prop_assert!(trees.iter().all(children_are_deeper));
        // The first heading always starts a root
        prop_assert_eq!(trees[0].entity.name.as_str(), "N0");
    }

    #[test]
    fn fields_stay_with_their_heading(levels in prop::collection::vec(1u8..=6, 1..16)) {
        let trees = parse_outline(&outline(&levels), &DocketFrontmatter::default(), &StatusMap::default());
        let mut stack: Vec<&EntityTree> = trees.iter().collect();
        while let Some(tree) = stack.pop() {
            let index = &tree.entity.name[1..];
            prop_assert_eq!(tree.entity.fields.get("Order").map(String::as_str), Some(index));
            prop_assert_eq!(tree.entity.line_number, index.parse::<usize>().unwrap() * 2 + 1);
            stack.extend(tree.children.iter());
        }
    }
}
