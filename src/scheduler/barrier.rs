/*
    spark_fountain - A multithreaded particle fountain streamed to a point renderer.
    Copyright (C) 2022,2023  Ryan Andersen

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

//! Release-many / wait-for-all handshake between one coordinator and a fixed set of workers.
//!
//! Every worker has its own single-slot start channel, so a worker that finishes early can never
//! pick up a start signal meant for a slower one. All workers share one done channel.

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BarrierError {
    #[error("worker {worker} stopped listening for start signals")]
    StartDisconnected { worker: usize },

    #[error("every worker hung up with {outstanding} reports outstanding")]
    DoneDisconnected { outstanding: usize },
}

enum Signal<C> {
    Start(C),
    Shutdown,
}

/// Coordinator half of the handshake.
pub struct FrameBarrier<C, R> {
    starts: Vec<Sender<Signal<C>>>,
    done: Receiver<R>,
    in_flight: usize,
}

/// Worker half of the handshake.
pub struct WorkerEndpoint<C, R> {
    start: Receiver<Signal<C>>,
    done: Sender<R>,
}

impl<C: Clone, R> FrameBarrier<C, R> {
    /// Create the coordinator half together with one endpoint per worker.
    pub fn new(workers: usize) -> (Self, Vec<WorkerEndpoint<C, R>>) {
        let (done_tx, done_rx) = crossbeam_channel::bounded(workers);
        let (starts, endpoints) = (0..workers)
            .map(|_| {
                let (start_tx, start_rx) = crossbeam_channel::bounded(1);
                (
                    start_tx,
                    WorkerEndpoint {
                        start: start_rx,
                        done: done_tx.clone(),
                    },
                )
            })
            .unzip();

        (
            Self {
                starts,
                done: done_rx,
                in_flight: 0,
            },
            endpoints,
        )
    }

    pub fn workers(&self) -> usize {
        self.starts.len()
    }

    /// Hand `command` to every worker. Every reachable worker is released even if an earlier one
    /// is gone; the first disconnected worker is reported.
    pub fn release(&mut self, command: C) -> Result<(), BarrierError> {
        debug_assert_eq!(self.in_flight, 0, "released a frame before collecting the previous one");

        let mut first_lost = None;
        for (worker, start) in self.starts.iter().enumerate() {
            match start.send(Signal::Start(command.clone())) {
                Ok(()) => self.in_flight += 1,
                Err(_) => {
                    first_lost.get_or_insert(worker);
                }
            }
        }

        match first_lost {
            None => Ok(()),
            Some(worker) => Err(BarrierError::StartDisconnected { worker }),
        }
    }

    /// Block until every released worker has reported, passing each report to `on_report`.
    pub fn wait_all(&mut self, mut on_report: impl FnMut(R)) -> Result<(), BarrierError> {
        while self.in_flight > 0 {
            match self.done.recv() {
                Ok(report) => {
                    self.in_flight -= 1;
                    on_report(report)
                }
                Err(_) => {
                    let outstanding = std::mem::take(&mut self.in_flight);
                    return Err(BarrierError::DoneDisconnected { outstanding });
                }
            }
        }
        Ok(())
    }

    /// Ask every worker to leave its loop the next time it waits for a start signal.
    pub fn shutdown(&self) {
        for start in &self.starts {
            // A worker that already exited has nothing left to stop
            let _ = start.send(Signal::Shutdown);
        }
    }
}

impl<C, R> WorkerEndpoint<C, R> {
    /// Park until the next start signal. `None` means shut down.
    pub fn wait_start(&self) -> Option<C> {
        match self.start.recv() {
            Ok(Signal::Start(command)) => Some(command),
            Ok(Signal::Shutdown) | Err(_) => None,
        }
    }

    pub fn post_done(&self, report: R) {
        // The coordinator only drops its receiver once it stopped waiting on us
        let _ = self.done.send(report);
    }

    pub fn done_sender(&self) -> Sender<R> {
        self.done.clone()
    }
}
