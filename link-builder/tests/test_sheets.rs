use anyhow::Result;
use link_builder::api::types::LinksResponse;
use link_builder::config::Config;
use link_builder::state::State;
use serde_json::json;

use crate::helpers::*;

pub mod helpers;

const CAMPAIGNS: &str = "\
Campaign,os,CTA,VTA,CTV,Onelink CTA,Onelink vta,Publisher name
moneyman,android,https://app.appsflyer.com/mm?pid=x&af_sub1=x,,https://impression.appsflyer.com/mm-a?pid=x&af_sub1=x,,,\"af_siteid, &af_sub_siteid\"
moneyman,ios,,,https://impression.appsflyer.com/mm-i?pid=x&af_sub1=x,,,
";

const PUBLISHERS: &str = "\
Pub name,Publisher_ID
Acme Media,acme-77
";

const CREATIVES: &str = "\
Campaign,Banner
MoneyMan,mm_banner
";

#[tokio::test]
async fn should_serve_links_from_csv_sheets() -> Result<()> {
    setup_tracing();
    let dir = tempfile::tempdir()?;
    let campaigns = dir.path().join("campaigns.csv");
    let publishers = dir.path().join("publishers.csv");
    let creatives = dir.path().join("creatives.csv");
    std::fs::write(&campaigns, CAMPAIGNS)?;
    std::fs::write(&publishers, PUBLISHERS)?;
    std::fs::write(&creatives, CREATIVES)?;

    let mut config = Config::default_for_test();
    config.campaign_sheet_csv = campaigns.display().to_string();
    config.publisher_sheet_csv = publishers.display().to_string();
    config.creative_sheet_csv = creatives.display().to_string();
    config.stats_file = dir.path().join("link_stats.csv").display().to_string();

    let server = ServerHandle::for_state(State::from_config(&config)?).await;
    let response = reqwest::Client::new()
        .post(server.url("/links"))
        .json(&json!({
            "campaign": "moneyman",
            "os": ["android", "ios"],
            "pid": "9",
            "link_types": ["CTV", "CTA"],
            "publisher": "Acme Media",
            "creative": "Banner"
        }))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body: LinksResponse = response.json().await?;
    assert_eq!(
        body.links,
        vec![
            "CTV (PID: 9): https://impression.appsflyer.com/mm-a?pid=9&af_sub1=9&af_siteid=acme-77&af_sub_siteid=acme-77&af_ad=mm_banner",
            "CTV (OS: android, PID: 9): https://impression.appsflyer.com/mm-a?pid=9&af_sub1=9&af_siteid=acme-77&af_sub_siteid=acme-77&af_ad=mm_banner",
            "CTA (OS: android, PID: 9): https://app.appsflyer.com/mm?pid=9&af_sub1=9&af_siteid=acme-77&af_sub_siteid=acme-77&af_ad=mm_banner",
            "CTV (OS: ios, PID: 9): https://impression.appsflyer.com/mm-i?pid=9&af_sub1=9&af_ad=mm_banner",
        ]
    );

    let stats = std::fs::read_to_string(dir.path().join("link_stats.csv"))?;
    assert_eq!(stats.lines().count(), 3);
    assert!(stats.contains(",moneyman,CTV,1,3"));
    assert!(stats.contains(",moneyman,CTA,1,1"));

    Ok(())
}

#[tokio::test]
async fn should_return_503_when_sheets_are_missing() -> Result<()> {
    let mut config = Config::default_for_test();
    config.campaign_sheet_csv = "/nonexistent/campaigns.csv".to_string();
    config.publisher_sheet_csv = "/nonexistent/publishers.csv".to_string();

    let server = ServerHandle::for_state(State::from_config(&config)?).await;
    let response = reqwest::get(server.url("/options")).await?;
    assert_eq!(response.status(), 503);

    Ok(())
}
