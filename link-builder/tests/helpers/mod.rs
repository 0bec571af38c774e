use std::{
    net::SocketAddr,
    sync::{Arc, Once},
};

use link_builder::links::types::{CampaignRow, CreativeTable, DataSnapshot, LinkType};
use link_builder::server::serve;
use link_builder::state::State;
use tokio::{net::TcpListener, sync::Notify};

static TRACING_INIT: Once = Once::new();
pub fn setup_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_writer(tracing_subscriber::fmt::TestWriter::new())
            .init()
    });
}

pub struct ServerHandle {
    pub addr: SocketAddr,
    pub shutdown: Arc<Notify>,
}

impl ServerHandle {
    pub async fn for_state(state: State) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let notify = Arc::new(Notify::new());
        let shutdown = notify.clone();

        tokio::spawn(async move {
            serve(state, listener, async move { notify.notified().await }).await
        });

        Self { addr, shutdown }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.notify_one()
    }
}

pub fn test_snapshot() -> DataSnapshot {
    let mut creatives = CreativeTable::new();
    creatives.insert("kraken", "Banner", "Kraken_Summer_Banner");
    creatives.insert("kraken", "Video", "0");

    DataSnapshot {
        rows: vec![
            CampaignRow::new("Banki", "android")
                .with_template(
                    LinkType::Cta,
                    "https://app.appsflyer.com/ru.banki?pid=old&c=afl_26_24_cpa_zorka_OLD&af_siteid=x",
                )
                .with_template(
                    LinkType::OnelinkCta,
                    "https://banki.onelink.me/Ab1?pid=old&af_channel=afl_26_24_cpa_zorka_OLD",
                )
                .with_publisher_macros("af_siteid"),
            CampaignRow::new("Banki", "ios").with_template(
                LinkType::Cta,
                "https://app.appsflyer.com/id123?pid=old&c=afl_26_24_cpa_zorka_OLD",
            ),
            CampaignRow::new("AngelOne", "android").with_template(
                LinkType::Vta,
                "https://app.appsflyer.com/angel?c=App_Inno_Axponent_OLD&x=1",
            ),
            CampaignRow::new("Kraken", "android")
                .with_template(
                    LinkType::Cta,
                    "https://app.appsflyer.com/kraken?pid=old&af_sub5=0&af_ad=none",
                )
                .with_template(
                    LinkType::Ctv,
                    "https://impression.appsflyer.com/kraken?pid=old&af_sub5=0&af_ad=none",
                ),
        ],
        publishers: [("Acme Media", "acme-77")].into_iter().collect(),
        creatives,
    }
}
