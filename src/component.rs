//! Defines the Component trait, used by each stage of the press. This
//! enforces a common interface between stages, so that each stage can
//! consume data from the preceding stage, process it, and pass new data to
//! the subsequent stage in the pipeline.

use crate::error::PressResult;
use log::{info, warn};
use std::fmt;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

///
/// A stage of the press: unspinning, sonifying, analysing, or spinning.
/// All structs that perform a processing step must implement Component, so
/// that they can be wired into a [PressLine](crate::press::PressLine).
///
pub trait Component: fmt::Display {
    /// What the stage receives from upstream
    type InData;
    /// What the stage hands downstream
    type OutData;

    /// Converts an input of type InData into an output of type OutData
    fn convert(&mut self, input: Self::InData) -> Self::OutData;

    /// Cleans up at termination of the pipeline
    fn finalize(&mut self) -> PressResult<()> {
        Ok(())
    }
}

/// Runs the given Component on its own thread. On receiving data of type
/// InData on the input channel, the Component converts it to data of type
/// OutData and sends it to the output channel. The thread ends once the
/// input channel hangs up, or once nobody is listening on the output.
pub fn run_component<C>(
    mut component: C,
    input: Receiver<C::InData>,
    output: Sender<C::OutData>,
) -> JoinHandle<()>
where
    C: Component + Send + 'static,
    C::InData: Send + 'static,
    C::OutData: Send + 'static,
{
    thread::spawn(move || {
        while let Ok(data) = input.recv() {
            let out_data = component.convert(data);
            if let Err(error) = output.send(out_data) {
                warn!("{} : received error {}.", component, error);
                break;
            }
        }

        if let Err(component_error) = component.finalize() {
            warn!("{} : error during terminating : {}.", component, component_error);
        }
        info!("{} : terminated.", component);
    })
}
