//! State shared between the manager handle and its connection driver.

use std::cell::Cell;
use std::sync::{Mutex, MutexGuard, PoisonError};

use cryptek_common::SessionKey;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::types::ConnectionState;
use crate::listeners::ListenerRegistry;

/// Mutable connection bookkeeping.
///
/// `generation` changes on every `connect` and `disconnect`; a driver only
/// touches this state while its own generation is still current.
#[derive(Default)]
pub(crate) struct LinkState {
    pub(crate) state: ConnectionState,
    pub(crate) generation: u64,
    pub(crate) attempts: u32,
    pub(crate) session: Option<SessionKey>,
    /// Present only while `Connected`.
    pub(crate) outbound: Option<mpsc::UnboundedSender<String>>,
    /// Cancels the driver (and any pending reconnect timer).
    pub(crate) cancel: Option<CancellationToken>,
}

thread_local! {
    /// Address of the `Shared` this thread is delivering for (0 when none),
    /// so listeners that call back into their manager do not wait on the
    /// gate they already hold.
    static DELIVERING: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as delivering for one `Shared` until dropped.
struct DeliveryMark {
    previous: usize,
}

impl DeliveryMark {
    fn set(shared: &Shared) -> Self {
        Self {
            previous: DELIVERING.with(|slot| slot.replace(shared.address())),
        }
    }
}

impl Drop for DeliveryMark {
    fn drop(&mut self) {
        DELIVERING.with(|flag| flag.set(self.previous));
    }
}

#[derive(Default)]
pub(crate) struct Shared {
    pub(crate) listeners: ListenerRegistry,
    link: Mutex<LinkState>,
    /// Serializes listener delivery between the driver and the handle.
    ///
    /// Once `disconnect` has bumped the generation and passed this gate, no
    /// delivery from the old driver can follow its terminal event.
    gate: Mutex<()>,
}

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, LinkState> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Run `f` on the link state only if `generation` still owns it.
    pub(crate) fn with_current<R>(
        &self,
        generation: u64,
        f: impl FnOnce(&mut LinkState) -> R,
    ) -> Option<R> {
        let mut link = self.lock();
        (link.generation == generation).then(|| f(&mut link))
    }

    /// Deliver to listeners only if `generation` still owns the link.
    ///
    /// The generation check and the delivery happen under the gate, so a
    /// concurrent `disconnect` either waits for this delivery or makes it a
    /// no-op.
    pub(crate) fn deliver_if_current<R>(&self, generation: u64, f: impl FnOnce() -> R) -> Option<R> {
        let _gate = self.enter_gate();
        if !self.is_current(generation) {
            return None;
        }
        let _mark = DeliveryMark::set(self);
        Some(f())
    }

    /// Deliver to listeners after any in-flight delivery has finished.
    pub(crate) fn deliver<R>(&self, f: impl FnOnce() -> R) -> R {
        let _gate = self.enter_gate();
        let _mark = DeliveryMark::set(self);
        f()
    }

    fn enter_gate(&self) -> Option<MutexGuard<'_, ()>> {
        if DELIVERING.with(Cell::get) == self.address() {
            return None;
        }
        Some(self.gate.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn address(&self) -> usize {
        self as *const Shared as usize
    }
}
