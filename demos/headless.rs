use pinmap::{
    geolocation::NoGeolocation, runtime::EffectRunner, LatLng, MapConfig, MapController,
    NominatimGeocoder, SceneBackend, UiEvent,
};
use std::sync::Arc;
use std::time::Duration;

/// Drive the controller without any UI: search for a place, drop a marker
/// next to it and wait for its address.
///
/// Usage: `cargo run --example headless -- "Monas, Jakarta"`
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Monas, Jakarta".to_string());

    let config = MapConfig::default();
    let geocoder = NominatimGeocoder::new(config.geocoder.clone())?;
    let mut controller = MapController::new(SceneBackend::new(), config)?;
    let runner = EffectRunner::new(
        tokio::runtime::Handle::current(),
        Arc::new(geocoder),
        Arc::new(NoGeolocation),
    );

    println!("pinmap headless");
    println!("searching for {:?}", query);

    let mut pending = 0usize;
    let mut queue = vec![UiEvent::SearchSubmitted(query)];
    let mut clicked = false;

    loop {
        for event in queue.drain(..) {
            let outcome = controller.handle(event)?;
            for notice in &outcome.notices {
                println!("notice: {}", notice);
            }
            pending += outcome.effects.len();
            runner.dispatch(outcome.effects);
        }

        // Once the search settled, click a little north-east of the result
        if pending == 0 && !clicked {
            clicked = true;
            if let Some(found) = controller.markers().at(0).map(|m| m.position()) {
                let nearby = LatLng::new(found.lat + 0.002, found.lng + 0.002);
                queue.push(UiEvent::MapClicked(nearby));
                continue;
            }
        }
        if pending == 0 {
            break;
        }

        let answer = tokio::task::block_in_place(|| runner.recv_timeout(Duration::from_secs(15)));
        match answer {
            Some(event) => {
                pending -= 1;
                queue.push(event);
            }
            None => {
                println!("timed out waiting for the geocoder");
                break;
            }
        }
    }

    let status = controller.status();
    println!();
    println!("style:   {}", status.style.label());
    println!("zoom:    {}", status.zoom_text());
    println!("center:  {}", controller.surface().center());
    println!("markers: {}", status.marker_count_text());
    for marker in controller.markers().iter() {
        let popup = marker.popup();
        println!(
            "  #{} {} -> {} ({}, {})",
            marker.id(),
            marker.title(),
            popup.heading,
            popup.position.lat_text(),
            popup.position.lng_text()
        );
    }

    Ok(())
}
