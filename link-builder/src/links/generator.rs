use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::links::campaign_rules::apply_campaign_rules;
use crate::links::creative::CreativeOverlay;
use crate::links::query::TrackingUrl;
use crate::links::resolver::{
    matching_rows, normal_link_types, resolve_normal, resolve_special, ResolvedTemplate,
};
use crate::links::tracker::{GenerationKey, GenerationTracker, KrakenUsage};
use crate::links::types::{DataSnapshot, LinkType};

pub const INVALID_PUBLISHER_MESSAGE: &str = "Invalid Publisher selected";

/// Body of a link generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRequest {
    pub campaign: String,
    #[serde(default)]
    pub os: Vec<String>,
    /// Comma separated PIDs.
    #[serde(default)]
    pub pid: String,
    #[serde(default)]
    pub link_types: Vec<LinkType>,
    /// Publisher display name, looked up in the publisher directory.
    #[serde(default)]
    pub publisher: Option<String>,
    /// Explicit publisher id; wins over the directory lookup.
    #[serde(default)]
    pub publisher_id: Option<String>,
    /// Creative column to take the `af_ad` override from.
    #[serde(default)]
    pub creative: Option<String>,
}

impl LinkRequest {
    pub fn pids(&self) -> Vec<String> {
        self.pid
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Number of links produced for one link type, to be added to the daily stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsDelta {
    pub link_type: LinkType,
    pub links: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Output lines in emission order, diagnostics included.
    pub lines: Vec<String>,
    /// Number of PIDs in the request, the `pid_count` of the stats records.
    pub pid_count: usize,
    pub stats: Vec<StatsDelta>,
}

impl GenerationOutcome {
    pub fn links_generated(&self) -> u64 {
        self.stats.iter().map(|s| s.links).sum()
    }
}

/// State that lives for exactly one request.
#[derive(Debug, Default)]
struct RequestContext {
    generated: GenerationTracker,
    kraken_usage: KrakenUsage,
}

pub struct LinkGenerator<'a> {
    snapshot: &'a DataSnapshot,
}

impl<'a> LinkGenerator<'a> {
    pub fn new(snapshot: &'a DataSnapshot) -> Self {
        LinkGenerator { snapshot }
    }

    #[instrument(skip_all, fields(campaign = %request.campaign.trim()))]
    pub fn generate<R: Rng + ?Sized>(
        &self,
        request: &LinkRequest,
        rng: &mut R,
    ) -> GenerationOutcome {
        let campaign = request.campaign.trim();
        let pids = request.pids();
        let mut outcome = GenerationOutcome {
            pid_count: pids.len(),
            ..Default::default()
        };

        let rows = match matching_rows(&self.snapshot.rows, campaign, &request.os) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::info!(os = ?request.os, "{}", e);
                outcome.lines.push(e.to_string());
                return outcome;
            }
        };

        let publisher_id = self.resolve_publisher(request, &mut outcome.lines);
        let overlay = CreativeOverlay::lookup(
            &self.snapshot.creatives,
            campaign,
            request.creative.as_deref(),
        );
        let build = LinkBuilder {
            campaign,
            publisher_id: &publisher_id,
            overlay: &overlay,
        };
        let mut ctx = RequestContext::default();

        for link_type in LinkType::SPECIAL {
            if !request.link_types.contains(&link_type) {
                continue;
            }
            let Some(resolved) = resolve_special(&rows, link_type) else {
                continue;
            };

            let mut count = 0;
            for pid in &pids {
                let key = GenerationKey::special(link_type, pid);
                if !ctx.generated.should_emit(&key) {
                    continue;
                }
                let url = build.link(&resolved, pid, &key, &mut ctx, rng);
                outcome
                    .lines
                    .push(format!("{link_type} (PID: {pid}): {url}"));
                ctx.generated.mark_emitted(key);
                count += 1;
            }
            push_stats(&mut outcome.stats, link_type, count);
        }

        let normal_types = normal_link_types(campaign, &request.link_types);
        for row in &rows {
            for &link_type in &normal_types {
                let Some(resolved) = resolve_normal(row, link_type) else {
                    continue;
                };

                let mut count = 0;
                for pid in &pids {
                    let key = GenerationKey::normal(link_type, &row.os, pid);
                    if !ctx.generated.should_emit(&key) {
                        continue;
                    }
                    let url = build.link(&resolved, pid, &key, &mut ctx, rng);
                    outcome
                        .lines
                        .push(format!("{link_type} (OS: {}, PID: {pid}): {url}", row.os));
                    ctx.generated.mark_emitted(key);
                    count += 1;
                }
                push_stats(&mut outcome.stats, link_type, count);
            }
        }

        tracing::debug!(
            links = ctx.generated.len(),
            pid_count = outcome.pid_count,
            "generated links"
        );
        outcome
    }

    fn resolve_publisher(&self, request: &LinkRequest, lines: &mut Vec<String>) -> String {
        if let Some(id) = request
            .publisher_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            return id.to_string();
        }

        let name = request.publisher.as_deref().map(str::trim).unwrap_or_default();
        match self.snapshot.publishers.get(name) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                if !name.is_empty() {
                    tracing::warn!(publisher = name, "publisher not found in directory");
                    lines.push(INVALID_PUBLISHER_MESSAGE.to_string());
                }
                String::new()
            }
        }
    }
}

struct LinkBuilder<'r> {
    campaign: &'r str,
    publisher_id: &'r str,
    overlay: &'r CreativeOverlay,
}

impl LinkBuilder<'_> {
    fn link<R: Rng + ?Sized>(
        &self,
        resolved: &ResolvedTemplate<'_>,
        pid: &str,
        key: &GenerationKey,
        ctx: &mut RequestContext,
        rng: &mut R,
    ) -> String {
        let mut url = TrackingUrl::parse(resolved.template);
        url.set("pid", pid);
        url.apply_publisher_macros(self.publisher_id, resolved.publisher_macros);
        apply_campaign_rules(&mut url, self.campaign, pid, &mut ctx.kraken_usage, key, rng);
        self.overlay.apply(&mut url);
        url.to_string()
    }
}

fn push_stats(stats: &mut Vec<StatsDelta>, link_type: LinkType, links: u64) {
    if links > 0 {
        stats.push(StatsDelta { link_type, links });
    }
}
