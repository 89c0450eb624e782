use log::{debug, error, info, warn};
use time::{OffsetDateTime, PrimitiveDateTime};

use sawlog_poller::codec::{register, timestamp};
use sawlog_poller::models::REGISTER_CAPACITY;
use sawlog_poller::transport::SimulatedController;
use sawlog_poller::utils::summarise_payload;
use sawlog_poller::{
    PollingSession, Record, RecordDraft, RegisterBlock, SessionConfig, SessionHandle,
    SessionStatus, Snapshot, WriteGateway,
};

/// Fill a register with recognisable records so the demo has something to show
fn demo_register() -> Result<RegisterBlock, Box<dyn std::error::Error>> {
    let now = OffsetDateTime::now_utc();
    let stamp = timestamp::from_calendar(&PrimitiveDateTime::new(now.date(), now.time()))?;

    let records = (0..REGISTER_CAPACITY)
        .map(|i| {
            let mut record = Record {
                id: i as u32 + 1,
                zone_id: (i % 4) as u8,
                sensor_id: (i % 16) as u8,
                length: 3000 + (i as u16 % 500),
                position: i as u32 * 120,
                drop_box_number: (i % 12) as u16,
                timestamp: stamp,
                ..Record::default()
            };
            record.flags[i % 32] = true;
            record.buttons[0] = (i % 8) as u8; // first order
            record.buttons[32] = (i % 3) as u8 + 1; // first count
            record
        })
        .collect();
    Ok(RegisterBlock::new(records)?)
}

/// Edit the first record's length and write it back on a separate connection
async fn demo_write_back(
    controller: SimulatedController,
    config: SessionConfig,
    first: Record,
) -> sawlog_poller::Result<()> {
    let mut draft = RecordDraft::from(&first);
    draft.length += 1;
    let edited = Record::try_from(draft)?;

    let mut gateway = WriteGateway::new(
        controller.transport(),
        config.endpoint.clone(),
        config.request.block_id,
    );
    gateway.write_record(0, &edited, 0).await?;
    Ok(())
}

async fn main_loop(
    controller: SimulatedController,
    config: SessionConfig,
    handle: &SessionHandle,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut snapshots = handle.subscribe_snapshots();
    let mut status = handle.subscribe_status();
    let mut wrote_back = false;

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if snapshot == Snapshot::Closed {
                    return Ok(());
                }
                if let Snapshot::Ready(data) = snapshot {
                    info!(
                        "\n{}",
                        summarise_payload(&data, config.request.block_id, config.request.start)
                    );

                    let first = data.records.as_ref().and_then(|records| records.first().cloned());
                    if !wrote_back {
                        if let Some(first) = first {
                            wrote_back = true;
                            let controller = controller.clone();
                            let config = config.clone();
                            tokio::spawn(async move {
                                if let Err(e) = demo_write_back(controller, config, first).await {
                                    error!("Write-back failed: {}", e);
                                }
                            });
                        }
                    }
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                match *status.borrow_and_update() {
                    SessionStatus::Connected => info!("Status: online"),
                    SessionStatus::BackingOff => warn!("Status: offline, backing off"),
                    current => debug!("Status: {:?}", current),
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match SessionConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // No S7 link layer ships with this crate; serve the block from memory
    warn!(
        "Using simulated controller for {}:{}",
        config.endpoint.address, config.endpoint.tcp_port
    );
    let controller = SimulatedController::new();
    let mut memory = register::encode(&demo_register()?);
    let needed = (config.request.start as usize).saturating_add(config.request.size as usize);
    if memory.len() < needed {
        memory.resize(needed, 0);
    }
    controller.set_block(config.request.block_id, memory);

    let handle = PollingSession::spawn(controller.transport(), config.clone())?;

    // Handle Ctrl+C gracefully; the loop below ends once the session closes
    let stop = handle.stop_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Program terminated by user. Exiting gracefully.");
        stop.cancel();
    });

    if let Err(e) = main_loop(controller, config, &handle).await {
        error!("Fatal error: {}", e);
    }

    handle.stop().await?;
    Ok(())
}
