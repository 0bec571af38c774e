use chrono::NaiveDate;
use metrics::counter;
use tracing::instrument;

use crate::api::errors::LinkServiceError;
use crate::api::types::{OptionsResponse, StatsResponse};
use crate::links::generator::{GenerationOutcome, LinkGenerator, LinkRequest};
use crate::links::types::LinkType;
use crate::metrics_utils::{LINKS_GENERATED_TOTAL, LINK_REQUESTS_TOTAL};
use crate::state::State;

/// Runs one link request: fresh snapshot, generation with request-scoped state, then
/// the stats update.
pub struct LinkService<'a> {
    state: &'a State,
}

impl<'a> LinkService<'a> {
    pub fn new(state: &'a State) -> Self {
        LinkService { state }
    }

    #[instrument(skip_all, fields(campaign = %request.campaign.trim()))]
    pub async fn generate_links(
        &self,
        request: &LinkRequest,
    ) -> Result<GenerationOutcome, LinkServiceError> {
        let pid_count = request.pids().len();
        if pid_count > self.state.max_pids_per_request {
            return Err(LinkServiceError::TooManyPids {
                count: pid_count,
                max: self.state.max_pids_per_request,
            });
        }

        let snapshot = self.state.source.load().await?;
        let outcome = {
            let mut rng = rand::thread_rng();
            LinkGenerator::new(&snapshot).generate(request, &mut rng)
        };
        counter!(LINK_REQUESTS_TOTAL).increment(1);

        let campaign = request.campaign.trim();
        for delta in &outcome.stats {
            counter!(LINKS_GENERATED_TOTAL, "link_type" => delta.link_type.column_name())
                .increment(delta.links);
            self.state
                .stats
                .record_or_log(
                    campaign,
                    delta.link_type.column_name(),
                    outcome.pid_count as u64,
                    delta.links,
                )
                .await;
        }

        tracing::info!(
            pid_count = outcome.pid_count,
            links = outcome.links_generated(),
            "generated tracking links"
        );
        Ok(outcome)
    }

    pub async fn options(&self) -> Result<OptionsResponse, LinkServiceError> {
        let snapshot = self.state.source.load().await?;
        Ok(OptionsResponse {
            campaigns: snapshot.campaigns(),
            oses: snapshot.oses(),
            link_types: LinkType::ALL.to_vec(),
            publishers: snapshot.publishers.names().map(str::to_string).collect(),
        })
    }

    pub async fn stats(&self, date: Option<NaiveDate>) -> Result<StatsResponse, LinkServiceError> {
        let records = self.state.stats.store().records(date).await?;
        Ok(StatsResponse { records })
    }
}
