//! Ordering and membership of resume sections.
//!
//! Every operation here edits `section_order` and, for custom sections, the
//! matching `additional_details` entry. Built-in section content is never
//! touched.

use std::collections::HashSet;

use thiserror::Error;

use crate::resume::models::{
    Column, CustomSection, ResumeBuilderData, SectionId, DEFAULT_SECTION_ORDER,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SectionError {
    #[error("section index {index} is out of bounds for {len} sections")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("section name must contain at least one letter or digit")]
    EmptyName,

    #[error("'{0}' is not a common section")]
    UnknownCommonSection(String),

    #[error("'{0}' is the only section left and cannot be removed")]
    LastSection(String),
}

/// Catalog of one-click sections: `(key, title)`.
pub const COMMON_SECTIONS: &[(&str, &str)] = &[
    ("awards", "Awards"),
    ("certifications", "Certifications"),
    ("languages", "Languages"),
    ("interests", "Interests"),
];

pub fn common_section_title(key: &str) -> Option<&'static str> {
    COMMON_SECTIONS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, title)| *title)
}

/// Moves the entry at `from` to position `to`. Pure permutation.
pub fn reorder(order: &mut Vec<String>, from: usize, to: usize) -> Result<(), SectionError> {
    let len = order.len();
    for index in [from, to] {
        if index >= len {
            return Err(SectionError::IndexOutOfBounds { index, len });
        }
    }
    let moved = order.remove(from);
    order.insert(to, moved);
    Ok(())
}

/// `"Volunteer Work"` → `"volunteer_work"`.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Adds a user-named section to `column`.
///
/// Returns `Ok(false)` without changes when the derived id is already in the
/// order.
pub fn add_custom_section(
    data: &mut ResumeBuilderData,
    name: &str,
    column: Column,
) -> Result<bool, SectionError> {
    let key = slugify(name);
    if !key.chars().any(char::is_alphanumeric) {
        return Err(SectionError::EmptyName);
    }
    Ok(insert_custom(data, &key, name.trim(), column))
}

/// Adds a catalog section. Common sections always live in the main column.
pub fn add_common_section(
    data: &mut ResumeBuilderData,
    key: &str,
    title: &str,
) -> Result<bool, SectionError> {
    if common_section_title(key).is_none() {
        return Err(SectionError::UnknownCommonSection(key.to_string()));
    }
    Ok(insert_custom(data, key, title, Column::Main))
}

fn insert_custom(data: &mut ResumeBuilderData, key: &str, title: &str, column: Column) -> bool {
    let id = SectionId::custom(key).to_string();
    if data.section_order.iter().any(|s| *s == id) {
        return false;
    }
    data.additional_details
        .column_mut(column)
        .entry(key.to_string())
        .or_insert_with(|| CustomSection {
            title: title.to_string(),
            content: String::new(),
        });
    data.section_order.push(id);
    true
}

/// Removes a section from the order. Custom sections also lose their content;
/// built-in content stays so the section can be re-added.
///
/// The last remaining section stays: an empty order reads as a document from
/// before ordering existed and would come back with the defaults.
pub fn remove_section(
    data: &mut ResumeBuilderData,
    section_id: &str,
) -> Result<bool, SectionError> {
    if !data.section_order.iter().any(|s| s == section_id) {
        return Ok(false);
    }
    if data.section_order.iter().all(|s| s == section_id) {
        return Err(SectionError::LastSection(section_id.to_string()));
    }
    data.section_order.retain(|s| s != section_id);
    if let Some(SectionId::Custom(key)) = SectionId::parse(section_id) {
        data.additional_details.main.remove(&key);
        data.additional_details.sidebar.remove(&key);
    }
    Ok(true)
}

/// Installs the default order on documents saved before ordering existed.
pub fn ensure_section_order(data: &mut ResumeBuilderData) {
    if data.section_order.is_empty() {
        data.section_order = DEFAULT_SECTION_ORDER.iter().map(|s| s.to_string()).collect();
    }
}

/// Cleans an order before saving: default when empty, then drops unknown
/// ids, custom ids without content and repeats.
pub fn normalize_section_order(data: &mut ResumeBuilderData) {
    ensure_section_order(data);
    let mut seen = HashSet::new();
    let details = &data.additional_details;
    data.section_order.retain(|id| {
        let known = match SectionId::parse(id) {
            Some(SectionId::Custom(key)) => details.find(&key).is_some(),
            Some(_) => true,
            None => false,
        };
        known && seen.insert(id.clone())
    });
}

/// True when the section has something to show.
pub fn has_content(data: &ResumeBuilderData, section: &SectionId) -> bool {
    match section {
        SectionId::Summary => !data.summary.trim().is_empty(),
        SectionId::Experience => !data.experience.is_empty(),
        SectionId::Education => !data.education.is_empty(),
        SectionId::Skills => data.skills.iter().any(|s| !s.trim().is_empty()),
        SectionId::Custom(key) => data
            .additional_details
            .find(key)
            .is_some_and(|c| !c.content.trim().is_empty()),
    }
}

/// Order entries that would render, in order.
pub fn renderable_sections(data: &ResumeBuilderData) -> Vec<SectionId> {
    data.section_order
        .iter()
        .filter_map(|id| SectionId::parse(id))
        .filter(|section| has_content(data, section))
        .collect()
}
