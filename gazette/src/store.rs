use crate::{Action, State};
use futures::StreamExt;
use futures_signals::signal::{Mutable, MutableSignalCloned, SignalExt, SignalStream};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, trace};

#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum StoreError {
    #[error("state store is closed")]
    Closed,
}

enum Command<S: State> {
    Dispatch {
        action: S::Action,
        applied: Option<oneshot::Sender<()>>,
    },
    Subscribe(UnboundedSender<S::Action>),
    WithState(Box<dyn FnOnce(S) + Send>),
}

/// Owns the state tree and serialises every change through one queue.
///
/// Actions are reduced in the order they were dispatched, and each action is
/// handed to every [`ActionStream`] after the reducer has run. Cloning the
/// store is cheap; all clones share the same queue.
pub struct StateStore<S: State> {
    state: Mutable<S>,
    command_tx: UnboundedSender<Command<S>>,
}

impl<S: State> Clone for StateStore<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            command_tx: self.command_tx.clone(),
        }
    }
}

impl<S: State> StateStore<S> {
    /// Must be called from inside a tokio runtime.
    pub fn new(initial_state: S) -> Self {
        let state = Mutable::new(initial_state);
        let (command_tx, command_rx) = tokio::sync::mpsc::unbounded_channel::<Command<S>>();

        let state_clone = state.clone();

        tokio::spawn(async move {
            Self::process_queue(state_clone, command_rx).await;
        });

        StateStore { state, command_tx }
    }

    async fn process_queue(state: Mutable<S>, mut command_rx: UnboundedReceiver<Command<S>>) {
        let mut subscribers: Vec<UnboundedSender<S::Action>> = Vec::new();
        while let Some(command) = command_rx.recv().await {
            match command {
                Command::Dispatch { action, applied } => {
                    let new_state = state.get_cloned().reduce(&action);
                    state.set(new_state);
                    subscribers.retain(|subscriber| subscriber.send(action.clone()).is_ok());
                    if let Some(applied) = applied {
                        let _ = applied.send(());
                    }
                }
                Command::Subscribe(subscriber) => subscribers.push(subscriber),
                Command::WithState(action) => action(state.get_cloned()),
            }
        }
        trace!("state store queue closed");
    }

    pub fn to_stream(&self) -> SignalStream<MutableSignalCloned<S>> {
        self.state.signal_cloned().to_stream()
    }

    pub fn to_signal(&self) -> MutableSignalCloned<S> {
        self.state.signal_cloned()
    }

    /// Enqueues an action without waiting for it to be reduced.
    pub fn dispatch(&self, action: S::Action) -> Result<(), StoreError> {
        debug!(action = action.kind(), "dispatch");
        self.command_tx
            .send(Command::Dispatch {
                action,
                applied: None,
            })
            .map_err(|_| StoreError::Closed)
    }

    /// Enqueues an action and resolves once the reducer has applied it and
    /// every subscriber has received it.
    pub async fn put(&self, action: S::Action) -> Result<(), StoreError> {
        debug!(action = action.kind(), "put");
        let (applied_tx, applied_rx) = oneshot::channel();
        self.command_tx
            .send(Command::Dispatch {
                action,
                applied: Some(applied_tx),
            })
            .map_err(|_| StoreError::Closed)?;
        applied_rx.await.map_err(|_| StoreError::Closed)
    }

    /// Every action dispatched after this call returns is delivered to the stream.
    pub fn subscribe(&self) -> ActionStream<S::Action> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let _ = self.command_tx.send(Command::Subscribe(tx));
        ActionStream { rx }
    }

    pub fn with_state<F>(&self, action: F) -> Result<(), StoreError>
    where
        F: FnOnce(S) + Send + 'static,
    {
        self.command_tx
            .send(Command::WithState(Box::new(action)))
            .map_err(|_| StoreError::Closed)
    }

    pub fn get_state(&self) -> S {
        self.state.get_cloned()
    }

    pub fn select<T, F>(&self, selector: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        selector(&self.state.lock_ref())
    }

    /// Resolves with the state as it is after everything queued so far.
    pub async fn await_state(&self) -> Result<S, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.with_state(|state| {
            let _ = tx.send(state);
        })?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    /// Resolves with the first observed state matching `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<S, StoreError>
    where
        F: FnMut(&S) -> bool,
    {
        let mut stream = self.to_stream();
        while let Some(state) = stream.next().await {
            if predicate(&state) {
                return Ok(state);
            }
        }
        Err(StoreError::Closed)
    }
}

/// Ordered feed of dispatched actions, the "wait for event X" primitive of sagas.
pub struct ActionStream<A> {
    rx: UnboundedReceiver<A>,
}

impl<A: Action> ActionStream<A> {
    pub async fn next(&mut self) -> Result<A, StoreError> {
        self.rx.recv().await.ok_or(StoreError::Closed)
    }

    /// Waits for the next action matching `predicate`, dropping the others.
    pub async fn take<F>(&mut self, mut predicate: F) -> Result<A, StoreError>
    where
        F: FnMut(&A) -> bool,
    {
        loop {
            let action = self.next().await?;
            if predicate(&action) {
                return Ok(action);
            }
        }
    }

    /// Like [`ActionStream::take`], extracting the payload in the same step.
    pub async fn take_map<T, F>(&mut self, mut extract: F) -> Result<T, StoreError>
    where
        F: FnMut(A) -> Option<T>,
    {
        loop {
            if let Some(value) = extract(self.next().await?) {
                return Ok(value);
            }
        }
    }
}
