// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Consumer role on a worker thread instead of a second process.

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use super::{ExchangeReport, detect_bgr, settle_landmarks};
use crate::core::{HandlinkConfig, HandlinkError, Result};
use crate::detector::{Detector, LandmarkDetector};
use crate::pipeline::{ImageFormat, ImageFrame};

struct Request {
    image: ImageFrame,
    reply: Sender<Result<ExchangeReport>>,
}

/// Worker thread owning a detector, fed frames over a channel.
pub struct InProcessExchange {
    requests: Option<Sender<Request>>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl InProcessExchange {
    /// Build the detector on a new worker thread. Returns once the detector
    /// is initialized, or with its initialization error.
    pub fn spawn<F>(make_detector: F, config: &HandlinkConfig) -> Result<Self>
    where
        F: FnOnce() -> Result<Detector> + Send + 'static,
    {
        let (requests, incoming) = crossbeam_channel::unbounded::<Request>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);
        let num_landmarks = config.num_landmarks;

        let worker = std::thread::Builder::new()
            .name("handlink-consumer".to_string())
            .spawn(move || {
                let mut detector = match make_detector() {
                    Ok(detector) => {
                        let _ = ready_tx.send(Ok(()));
                        detector
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return Ok(());
                    }
                };
                serve(&mut detector, &incoming, num_landmarks);
                detector.finish()
            })
            .map_err(|e| HandlinkError::ChildSpawnFailed(format!("consumer thread: {}", e)))?;

        let ready = ready_rx.recv().unwrap_or_else(|_| {
            Err(HandlinkError::ChildSpawnFailed(
                "consumer thread exited during startup".to_string(),
            ))
        });
        let mut exchange = Self {
            requests: Some(requests),
            worker: Some(worker),
        };
        if let Err(e) = ready {
            exchange.shutdown().ok();
            return Err(e);
        }
        tracing::info!("In-process consumer ready");
        Ok(exchange)
    }

    /// Detect on one packed BGR image.
    pub fn exchange(&self, image: &ImageFrame) -> Result<ExchangeReport> {
        if image.format() != ImageFormat::Bgr {
            return Err(HandlinkError::InvalidImage(format!(
                "exchange expects BGR input, got {:?}",
                image.format()
            )));
        }
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| HandlinkError::Graph("consumer thread stopped".to_string()))?;

        let (reply, response) = crossbeam_channel::bounded(1);
        requests
            .send(Request {
                image: image.clone(),
                reply,
            })
            .map_err(|_| HandlinkError::Graph("consumer thread stopped".to_string()))?;
        response
            .recv()
            .map_err(|_| HandlinkError::Graph("consumer thread dropped the request".to_string()))?
    }

    /// Stop the worker after it drains its detector.
    pub fn finish(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.requests = None;
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        worker
            .join()
            .map_err(|_| HandlinkError::Graph("consumer thread panicked".to_string()))?
    }
}

impl Drop for InProcessExchange {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("In-process consumer stopped with error: {}", e);
        }
    }
}

fn serve(detector: &mut Detector, incoming: &Receiver<Request>, num_landmarks: usize) {
    for request in incoming.iter() {
        let result = detect_one(detector, &request.image, num_landmarks);
        let _ = request.reply.send(result);
    }
}

/// Same landmarks as the two-process consumer: a frame whose landmarks miss
/// the bounded wait gets them once the graph is idle.
fn detect_one(
    detector: &mut Detector,
    image: &ImageFrame,
    num_landmarks: usize,
) -> Result<ExchangeReport> {
    let mut detection = detect_bgr(detector, &image.as_view())?;
    if detection.landmarks.is_none() {
        detector.wait_until_idle()?;
        settle_landmarks(&*detector, &mut detection);
    }
    Ok(ExchangeReport {
        coordinates: detection.coordinates(num_landmarks),
        output_image: detection.image,
    })
}

/// One exchange without a second process: spawn, detect once, drain.
pub fn run_in_process<F>(image: &ImageFrame, config: &HandlinkConfig, make_detector: F) -> Result<ExchangeReport>
where
    F: FnOnce() -> Result<Detector> + Send + 'static,
{
    let exchange = InProcessExchange::spawn(make_detector, config)?;
    let report = exchange.exchange(image)?;
    exchange.finish()?;
    Ok(report)
}
