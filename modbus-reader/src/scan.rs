use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{RegisterCatalog, RegisterDescriptor};
use crate::decoder::{decode, surplus_bytes, DecodeError, DecodedValue};
use crate::transport::{RegisterSource, TransportError};

/// Failure confined to a single register.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("{source}")]
    Transport {
        name: String,
        #[source]
        source: TransportError,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Outcome of reading one catalog entry.
#[derive(Debug)]
pub struct RegisterReport<'a> {
    pub descriptor: &'a RegisterDescriptor,
    pub outcome: Result<DecodedValue, RegisterError>,
}

/// Read and decode a single register.
pub async fn read_register<S>(
    descriptor: &RegisterDescriptor,
    source: &mut S,
) -> Result<DecodedValue, RegisterError>
where
    S: RegisterSource + ?Sized,
{
    debug!(
        address = descriptor.address,
        length = descriptor.length,
        name = %descriptor.name,
        "reading holding registers"
    );
    if let Some(surplus) = surplus_bytes(descriptor) {
        warn!(
            name = %descriptor.name,
            data_type = %descriptor.data_type,
            length = descriptor.length,
            surplus,
            "length exceeds data type width, trailing bytes ignored"
        );
    }
    let bytes = source
        .read_registers(descriptor.address, descriptor.length)
        .await
        .map_err(|source| RegisterError::Transport {
            name: descriptor.name.clone(),
            source,
        })?;
    Ok(decode(descriptor, &bytes)?)
}

/// Walk the catalog in order, handing each register's report to `sink`.
///
/// A failing register never stops the walk: every descriptor yields exactly one report.
pub async fn scan_with<'a, S, F>(catalog: &'a RegisterCatalog, source: &mut S, mut sink: F)
where
    S: RegisterSource + ?Sized,
    F: FnMut(RegisterReport<'a>),
{
    for descriptor in catalog {
        let outcome = read_register(descriptor, &mut *source).await;
        if let Err(err) = &outcome {
            warn!(address = descriptor.address, name = %descriptor.name, %err, "register skipped");
        }
        sink(RegisterReport {
            descriptor,
            outcome,
        });
    }
}

/// Collect the reports of a full pass over the catalog.
pub async fn scan<'a, S>(catalog: &'a RegisterCatalog, source: &mut S) -> Vec<RegisterReport<'a>>
where
    S: RegisterSource + ?Sized,
{
    let mut reports = Vec::with_capacity(catalog.len());
    scan_with(catalog, source, |report| reports.push(report)).await;
    reports
}

/// Scan once, or every `interval` until `shutdown` resolves.
///
/// `shutdown` is watched during scans as well as between them, so a hanging read
/// does not delay it. Returns the number of completed passes.
pub async fn run_until<'a, S, F, D>(
    catalog: &'a RegisterCatalog,
    source: &mut S,
    interval: Option<Duration>,
    shutdown: D,
    mut sink: F,
) -> usize
where
    S: RegisterSource + ?Sized,
    F: FnMut(RegisterReport<'a>),
    D: Future,
{
    tokio::pin!(shutdown);
    let mut passes = 0;

    loop {
        tokio::select! {
            _ = scan_with(catalog, &mut *source, &mut sink) => passes += 1,
            _ = &mut shutdown => break,
        }

        let Some(interval) = interval else {
            break;
        };
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut shutdown => break,
        }
    }

    passes
}
