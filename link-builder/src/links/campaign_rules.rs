use rand::seq::SliceRandom;
use rand::Rng;

use crate::links::query::TrackingUrl;
use crate::links::tracker::{GenerationKey, KrakenDraw, KrakenUsage};

const ANGEL_ONE_CAMPAIGN_PREFIX: &str = "App_Inno_Axponent_";
const BANKI_CAMPAIGN_PREFIX: &str = "afl_26_24_cpa_zorka_";
const BANKI_PARAMS: [&str; 3] = ["c", "af_c_id", "af_channel"];

pub const KRAKEN_SUB5_VALUES: [&str; 3] = ["1491074310", "1617391485", "591560124"];
pub const KRAKEN_AD_VALUES: [&str; 2] = ["Consumer-Banners-Creative-Refresh", "Kraken_Set_Trading"];

/// Advertiser specific rewrites, selected by campaign name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignRule {
    AngelOne,
    Banki,
    Moneyman,
    Kraken,
}

/// Lower-cases and strips spaces, so "Angel One" and "angelone" match the same rule.
pub fn normalize_campaign(campaign: &str) -> String {
    campaign
        .chars()
        .filter(|c| *c != ' ')
        .flat_map(char::to_lowercase)
        .collect()
}

impl CampaignRule {
    pub fn for_campaign(campaign: &str) -> Option<Self> {
        let name = normalize_campaign(campaign);
        match name.as_str() {
            "angelone" | "angel_one" => Some(CampaignRule::AngelOne),
            "banki" => Some(CampaignRule::Banki),
            "moneyman" => Some(CampaignRule::Moneyman),
            _ if name.starts_with("kraken") => Some(CampaignRule::Kraken),
            _ => None,
        }
    }

    pub fn apply<R: Rng + ?Sized>(
        &self,
        url: &mut TrackingUrl,
        pid: &str,
        kraken_usage: &mut KrakenUsage,
        key: &GenerationKey,
        rng: &mut R,
    ) {
        match self {
            CampaignRule::AngelOne => {
                url.replace_after_prefix("c", ANGEL_ONE_CAMPAIGN_PREFIX, pid);
            }
            CampaignRule::Banki => {
                for param in BANKI_PARAMS {
                    url.replace_after_prefix(param, BANKI_CAMPAIGN_PREFIX, pid);
                }
            }
            CampaignRule::Moneyman => {
                url.replace("af_sub1", pid);
            }
            CampaignRule::Kraken => {
                // One draw per key; both values are drawn even if the template lacks one.
                let draw = kraken_usage.get_or_draw(key, || KrakenDraw {
                    sub5: KRAKEN_SUB5_VALUES.choose(rng).copied().unwrap_or_default(),
                    ad: KRAKEN_AD_VALUES.choose(rng).copied().unwrap_or_default(),
                });
                url.replace("af_sub5", draw.sub5);
                url.replace("af_ad", draw.ad);
            }
        }
    }
}

/// Applies whatever rule matches `campaign`; unknown campaigns are left alone.
pub fn apply_campaign_rules<R: Rng + ?Sized>(
    url: &mut TrackingUrl,
    campaign: &str,
    pid: &str,
    kraken_usage: &mut KrakenUsage,
    key: &GenerationKey,
    rng: &mut R,
) {
    if let Some(rule) = CampaignRule::for_campaign(campaign) {
        rule.apply(url, pid, kraken_usage, key, rng);
    }
}
