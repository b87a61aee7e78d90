/*
 *  main.rs
 *
 *  pixclock - LED matrix clock and weather panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use anyhow::{Context, Result};
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};

use pixclock::config::{self, Settings};
use pixclock::display::text::font_by_name;
use pixclock::display::{DisplaySinkFactory, LayoutConfig, OverlayCompositor, StaticLayerBuilder};
use pixclock::icons::IconStore;
use pixclock::location;
use pixclock::scheduler::RefreshScheduler;
use pixclock::weather::WeatherClient;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

async fn shutdown() {
    if let Err(e) = signal_handler().await {
        error!("cannot install signal handlers: {e}");
        // run until killed
        std::future::pending::<()>().await;
    }
}

async fn run(settings: Settings) -> Result<()> {
    let clock_font = font_by_name(&settings.clock_font)
        .with_context(|| format!("unknown clock font '{}'", settings.clock_font))?;
    let text_font = font_by_name(&settings.text_font)
        .with_context(|| format!("unknown text font '{}'", settings.text_font))?;

    let location = location::get_location(settings.latitude, settings.longitude, settings.weather.timeout)
        .await
        .context("cannot determine location, set location.lat/lon or --lat/--lon")?;
    let weather = WeatherClient::new(&settings.weather, &location)
        .with_context(|| format!("weather client (key from config or ${})", config::API_KEY_ENV))?;

    let sink = DisplaySinkFactory::create_from_config(&settings.sink, &settings.geometry)
        .context("opening display sink")?;

    let layout = LayoutConfig::for_panels(&settings.geometry);
    for conflict in layout.font_conflicts(clock_font, text_font) {
        warn!("layout: {conflict}");
    }
    let icons = IconStore::load(&settings.icons_dir);
    info!("{} icons ready from {}", icons.len(), settings.icons_dir.display());

    let builder = StaticLayerBuilder::new(icons, text_font, layout.clone(), settings.theme);
    let overlay = OverlayCompositor::new(clock_font, &layout, settings.theme.clock);
    let mut scheduler = RefreshScheduler::new(sink, weather, builder, overlay, settings.weather.refresh);

    info!(
        "clock running: tick {:?}, weather every {:?} ({})",
        settings.tick, settings.weather.refresh, settings.weather.units
    );
    scheduler.run(settings.tick, shutdown()).await;

    info!("Main application exiting.");
    Ok(())
}

fn main() -> Result<()> {
    let cfg = config::load().context("loading configuration")?;
    let settings = cfg.resolve();

    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log_level.as_str()))
        .format_timestamp_secs()
        .init();

    info!("{} v.{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    // one cooperative loop; nothing here needs a second thread
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting tokio runtime")?;
    runtime.block_on(run(settings))
}
