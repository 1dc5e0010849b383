//! Test support: a minimal executor and scripted asset fetchers.

use crate::error::AssetError;
use crate::loader::AssetFetcher;
use crate::objects::ImageAsset;
use crate::storage::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::pin::{Pin, pin};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake, Waker};

struct NoopWaker;

impl Wake for NoopWaker {
    fn wake(self: Arc<Self>) {}
}

/// Drive a future to completion on the current thread by polling it.
pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    let waker = Waker::from(Arc::new(NoopWaker));
    let mut cx = Context::from_waker(&waker);
    let mut future = pin!(future);
    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }
    }
}

/// A future that stays pending for a number of polls.
pub(crate) struct Delay {
    remaining: usize,
}

impl Delay {
    pub(crate) fn polls(remaining: usize) -> Self {
        Self { remaining }
    }
}

impl Future for Delay {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.remaining == 0 {
            return Poll::Ready(());
        }
        self.remaining -= 1;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Serves fixed assets by source reference, each after its own delay,
/// and records when every fetch starts and finishes.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    assets: HashMap<String, (ImageAsset, usize)>,
    log: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serve `source` as an asset of the given size after `delay` polls.
    pub(crate) fn with(mut self, source: &str, width: u32, height: u32, delay: usize) -> Self {
        self.assets
            .insert(source.to_string(), (ImageAsset::new(width, height), delay));
        self
    }

    /// `start:<source>` and `end:<source>` entries in the order they happened.
    pub(crate) fn events(&self) -> Vec<String> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn note(&self, event: String) {
        if let Ok(mut log) = self.log.lock() {
            log.push(event);
        }
    }
}

impl AssetFetcher for ScriptedFetcher {
    fn fetch(&self, source: &str) -> BoxFuture<'_, Result<ImageAsset, AssetError>> {
        let source = source.to_string();
        Box::pin(async move {
            self.note(format!("start:{}", source));
            let Some((asset, delay)) = self.assets.get(&source).copied() else {
                self.note(format!("end:{}", source));
                return Err(AssetError::Unreachable(source));
            };
            Delay::polls(delay).await;
            self.note(format!("end:{}", source));
            Ok(asset)
        })
    }
}
