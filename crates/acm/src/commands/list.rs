//! Listing commands for containers and images

use crate::cli::{Cli, OutputFormat};
use crate::commands::shared;
use acm_core::output::{mark_images_in_use, ContainerSummary, ImageSummary};
use acm_core::runtime::ContainerBackend;
use anyhow::{Context, Result};
use console::style;
use tracing::instrument;

#[instrument(skip(cli))]
pub async fn containers(cli: &Cli, format: OutputFormat) -> Result<()> {
    let runtime = shared::runtime(cli);
    let containers = runtime
        .list_containers()
        .await
        .context("failed to list containers")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&containers)?),
        OutputFormat::Text => print_container_table(&containers),
    }
    Ok(())
}

#[instrument(skip(cli))]
pub async fn images(cli: &Cli, format: OutputFormat) -> Result<()> {
    let runtime = shared::runtime(cli);
    let mut images = runtime.list_images().await.context("failed to list images")?;
    // in-use needs the live containers; a listing failure here only loses
    // the flag, not the image list
    match runtime.list_containers().await {
        Ok(containers) => mark_images_in_use(&mut images, &containers),
        Err(e) => tracing::warn!("Could not compute in-use flags: {}", e),
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&images)?),
        OutputFormat::Text => print_image_table(&images),
    }
    Ok(())
}

fn print_container_table(containers: &[ContainerSummary]) {
    if containers.is_empty() {
        println!("No containers");
        return;
    }
    println!(
        "{}",
        style(format!(
            "{:<20} {:<28} {:<12} {:<24} {}",
            "NAME", "IMAGE", "STATUS", "PORTS", "ADDRESS"
        ))
        .bold()
    );
    for container in containers {
        println!(
            "{:<20} {:<28} {:<12} {:<24} {}",
            container.name,
            container.image,
            container.status,
            container.ports.as_deref().unwrap_or("-"),
            container.address.as_deref().unwrap_or("-"),
        );
    }
}

fn print_image_table(images: &[ImageSummary]) {
    if images.is_empty() {
        println!("No images");
        return;
    }
    println!(
        "{}",
        style(format!(
            "{:<32} {:<12} {:<10} {:<8} {}",
            "REPOSITORY", "TAG", "SIZE", "IN USE", "ID"
        ))
        .bold()
    );
    for image in images {
        println!(
            "{:<32} {:<12} {:<10} {:<8} {}",
            image.repository,
            image.tag,
            image.size.as_deref().unwrap_or("-"),
            if image.in_use { "yes" } else { "no" },
            image.id,
        );
    }
}
