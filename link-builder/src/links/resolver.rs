use thiserror::Error;

use crate::links::types::{CampaignRow, LinkType};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No matching campaign and OS found")]
    NoMatchingRows,
}

/// A template picked for one link type, together with the row it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTemplate<'a> {
    pub row: &'a CampaignRow,
    pub template: &'a str,
    pub publisher_macros: &'a str,
}

/// Rows of `campaign` (exact, case-sensitive) whose OS is one of `oses`, in table order.
pub fn matching_rows<'a>(
    rows: &'a [CampaignRow],
    campaign: &str,
    oses: &[String],
) -> Result<Vec<&'a CampaignRow>, ResolveError> {
    let matched: Vec<&CampaignRow> = rows
        .iter()
        .filter(|row| row.campaign == campaign && oses.iter().any(|os| *os == row.os))
        .collect();

    if matched.is_empty() {
        return Err(ResolveError::NoMatchingRows);
    }
    Ok(matched)
}

/// Special link types come from the first row carrying a template, whatever its OS.
pub fn resolve_special<'a>(
    rows: &[&'a CampaignRow],
    link_type: LinkType,
) -> Option<ResolvedTemplate<'a>> {
    rows.iter().find_map(|row| resolve_normal(*row, link_type))
}

pub fn resolve_normal(row: &CampaignRow, link_type: LinkType) -> Option<ResolvedTemplate<'_>> {
    row.template(link_type).map(|template| ResolvedTemplate {
        row,
        template,
        publisher_macros: row.publisher_macros.as_str(),
    })
}

/// Link types generated per OS row. CTV is global for every campaign except
/// Moneyman, which also has per-OS CTV templates.
pub fn normal_link_types(campaign: &str, selected: &[LinkType]) -> Vec<LinkType> {
    let per_os_ctv = campaign.trim().to_lowercase() == "moneyman";

    let mut link_types: Vec<LinkType> = Vec::with_capacity(selected.len());
    for link_type in selected {
        let keep = match link_type {
            LinkType::Cta | LinkType::Vta => true,
            LinkType::Ctv => per_os_ctv,
            LinkType::OnelinkCta | LinkType::OnelinkVta => false,
        };
        if keep && !link_types.contains(link_type) {
            link_types.push(*link_type);
        }
    }
    link_types
}
