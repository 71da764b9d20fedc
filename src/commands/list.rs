// ABOUTME: Listing commands: images, containers, and engine info.
// ABOUTME: Thin pass-throughs to the inventory and engine, formatted per output mode.

use super::close;
use dregs::config::Config;
use dregs::connection::Connection;
use dregs::engine::{ContainerFilters, ContainerSummary, Engine, EngineError, ImageFilter, ImageSummary};
use dregs::error::Result;
use dregs::inventory::{Inventory, InventoryError};
use dregs::output::Output;

pub async fn images(config: &Config, dangling: bool, output: Output) -> Result<()> {
    let connection = Connection::open(config, &output).await?;
    let result = show_images(connection.engine(), dangling, &output).await;
    close(connection, &output).await;
    result
}

pub async fn containers(config: &Config, all: bool, output: Output) -> Result<()> {
    let connection = Connection::open(config, &output).await?;
    let result = show_containers(connection.engine(), all, &output).await;
    close(connection, &output).await;
    result
}

pub async fn info(config: &Config, output: Output) -> Result<()> {
    let connection = Connection::open(config, &output).await?;
    let result = show_info(connection.engine(), &output).await;
    close(connection, &output).await;
    result
}

pub(super) async fn show_images(engine: &dyn Engine, dangling: bool, output: &Output) -> Result<()> {
    let filter = if dangling {
        ImageFilter::Dangling
    } else {
        ImageFilter::All
    };
    let images = Inventory::new(engine).list_images(filter).await?;

    let mut lines = vec![format!(
        "{:<12}  {:<40}  {:>10}  {}",
        "IMAGE ID", "TAG", "SIZE", "CREATED"
    )];
    lines.extend(images.iter().map(image_line));
    output.records("images", &images, &lines);
    Ok(())
}

fn image_line(image: &ImageSummary) -> String {
    format!(
        "{:<12}  {:<40}  {:>10}  {}",
        image.id.short(),
        image.display_name(),
        human_size(image.size),
        image.created.format("%Y-%m-%d %H:%M")
    )
}

pub(super) async fn show_containers(engine: &dyn Engine, all: bool, output: &Output) -> Result<()> {
    let filters = ContainerFilters {
        all,
        ..Default::default()
    };
    let containers = engine
        .list_containers(&filters)
        .await
        .map_err(InventoryError::from)?;

    let mut lines = vec![format!(
        "{:<12}  {:<24}  {:<40}  {}",
        "CONTAINER ID", "NAME", "IMAGE", "STATUS"
    )];
    lines.extend(containers.iter().map(container_line));
    output.records("containers", &containers, &lines);
    Ok(())
}

fn container_line(container: &ContainerSummary) -> String {
    format!(
        "{:<12}  {:<24}  {:<40}  {}",
        container.id.short(),
        container.name,
        container.image,
        container.status
    )
}

pub(super) async fn show_info(engine: &dyn Engine, output: &Output) -> Result<()> {
    let meta = engine.info().await.map_err(EngineError::from)?;
    let lines = vec![
        format!("Engine:   {}", meta.name),
        format!("Version:  {}", meta.version),
        format!("Platform: {}/{}", meta.os, meta.arch),
    ];
    output.records("info", std::slice::from_ref(&meta), &lines);
    Ok(())
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::human_size;

    #[test]
    fn sizes_use_decimal_units() {
        assert_eq!(human_size(512), "512B");
        assert_eq!(human_size(1_500), "1.5kB");
        assert_eq!(human_size(72_800_000), "72.8MB");
    }
}
