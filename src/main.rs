use huawei_solar_bridge::prelude::*;

#[tokio::main]
async fn main() {
    if let Err(err) = huawei_solar_bridge::app().await {
        error!("{:?}", err);
        std::process::exit(255);
    }
}
