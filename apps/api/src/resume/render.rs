//! Render mapping: decides where each section of a resume goes.
//!
//! The plan is layout only: which strategy, which column, which sequence.
//! Drawing the sections is the client's job.

use serde::{Deserialize, Serialize};

use crate::resume::models::{Column, Layout, ResumeBuilderData, SectionId};
use crate::resume::sections::renderable_sections;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemplateVariant {
    Modern,
    Creative,
}

impl TemplateVariant {
    /// `creative` templates get the Creative variant; everything else is Modern.
    pub fn from_category(category: &str) -> Self {
        if category.trim().eq_ignore_ascii_case("creative") {
            TemplateVariant::Creative
        } else {
            TemplateVariant::Modern
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SidebarSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayoutStrategy {
    SingleColumn,
    TwoColumn { sidebar: SidebarSide },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedSection {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlan {
    pub variant: TemplateVariant,
    pub strategy: LayoutStrategy,
    /// Stacked sections for single-column, main column otherwise.
    pub main: Vec<PlannedSection>,
    /// Always empty for single-column.
    pub sidebar: Vec<PlannedSection>,
}

pub fn select_strategy(variant: TemplateVariant, layout: Layout) -> LayoutStrategy {
    match (variant, layout) {
        (_, Layout::TwoColumnRight) => LayoutStrategy::TwoColumn {
            sidebar: SidebarSide::Right,
        },
        (_, Layout::TwoColumnLeft) | (TemplateVariant::Creative, Layout::SingleColumn) => {
            LayoutStrategy::TwoColumn {
                sidebar: SidebarSide::Left,
            }
        }
        (TemplateVariant::Modern, Layout::SingleColumn) => LayoutStrategy::SingleColumn,
    }
}

/// Fixed two-column placement; not configurable per section.
pub fn column_for(section: &SectionId) -> Column {
    match section {
        SectionId::Summary | SectionId::Skills | SectionId::Education => Column::Sidebar,
        SectionId::Experience | SectionId::Custom(_) => Column::Main,
    }
}

pub fn section_title(data: &ResumeBuilderData, section: &SectionId) -> String {
    match section {
        SectionId::Summary => "Summary".to_string(),
        SectionId::Experience => "Experience".to_string(),
        SectionId::Education => "Education".to_string(),
        SectionId::Skills => "Skills".to_string(),
        SectionId::Custom(key) => data
            .additional_details
            .find(key)
            .map(|c| c.title.clone())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| key.replace('_', " ")),
    }
}

/// Maps `section_order` onto the chosen strategy. Empty and unknown sections
/// are skipped; order only decides the sequence within a column.
pub fn plan_render(data: &ResumeBuilderData, category: &str) -> RenderPlan {
    let variant = TemplateVariant::from_category(category);
    let strategy = select_strategy(variant, data.layout);

    let mut main = Vec::new();
    let mut sidebar = Vec::new();
    for section in renderable_sections(data) {
        let planned = PlannedSection {
            id: section.to_string(),
            title: section_title(data, &section),
        };
        match (strategy, column_for(&section)) {
            (LayoutStrategy::TwoColumn { .. }, Column::Sidebar) => sidebar.push(planned),
            _ => main.push(planned),
        }
    }

    RenderPlan {
        variant,
        strategy,
        main,
        sidebar,
    }
}
