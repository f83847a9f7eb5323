use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::Parser;
use client_core::{config::load_settings, BookingWizard, HttpBookingApi};
use shared::domain::{ClientInfo, TimeSlot};

/// Books one appointment through the public wizard, end to end.
#[derive(Parser, Debug)]
struct Args {
    /// Overrides booking.toml / BOOKING_SERVER_URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Public slug of the professional's booking page.
    #[arg(long)]
    slug: String,
    /// Service name as listed on the profile.
    #[arg(long)]
    service: String,
    /// Date to query, e.g. 2024-06-10.
    #[arg(long)]
    date: NaiveDate,
    /// Slot start time, e.g. 09:30. Defaults to the first free slot.
    #[arg(long, value_parser = parse_start)]
    start: Option<NaiveTime>,
    #[arg(long)]
    name: String,
    /// WhatsApp-reachable phone, e.g. +5511999999999.
    #[arg(long)]
    phone: String,
    #[arg(long)]
    notes: Option<String>,
}

fn parse_start(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let server_url = args
        .server_url
        .unwrap_or_else(|| load_settings().server_url);
    let api = Arc::new(HttpBookingApi::new(&server_url)?);

    let wizard = BookingWizard::start(api, &args.slug)
        .await
        .with_context(|| format!("could not open booking page for {}", args.slug))?;
    println!("Booking with {}", wizard.professional().display_name);

    let service = wizard
        .services()
        .iter()
        .find(|service| service.name == args.service)
        .cloned()
        .with_context(|| {
            let offered: Vec<_> = wizard.services().iter().map(|s| s.name.clone()).collect();
            format!("service {:?} not offered; available: {offered:?}", args.service)
        })?;
    wizard.select_service(service.id).await?;

    wizard.load_slots(args.date).await?;
    let board = wizard
        .board()
        .await
        .context("availability board missing after a successful query")?;
    if board.slots.is_empty() {
        bail!("no free slots on {}", args.date);
    }

    let slot = match args.start {
        Some(start) => TimeSlot {
            date: args.date,
            start,
        },
        None => board.slots[0],
    };
    wizard.select_slot(slot).await?;

    let booking = wizard
        .submit(ClientInfo {
            name: args.name,
            phone: args.phone,
            notes: args.notes,
        })
        .await?;

    println!(
        "Booked {} on {} at {}: status {:?}, reference {}",
        service.name, booking.slot.date, booking.slot.start, booking.status, booking.id.0
    );
    Ok(())
}
