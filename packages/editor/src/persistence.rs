//! # Persistence Gateway
//!
//! Mirrors local edits to the [`SectionRepository`] without ever blocking
//! or rolling back the local document.
//!
//! ## Write kinds
//!
//! - **Debounced updates**: one pending slot per [`PersistKey`]. Scheduling
//!   a key again cancels its timer and restarts the delay, so a burst of
//!   edits produces a single write. When the timer fires the write reads
//!   the *latest* published document, not the state at schedule time.
//! - **Immediate writes**: creates and deletes are sent right away as
//!   fire-and-forget tasks. Deleting an entity cancels its pending keys
//!   first so no update lands after the delete.
//!
//! ## Ordering
//!
//! Writes touching the same entity reach the repository in the order they
//! were issued: each write waits for the previous write of its entity to
//! finish before it is sent. A delete issued while the create is still in
//! flight therefore lands after it. There is no ordering between
//! different entities.
//!
//! Failures are logged and dropped. There is no retry queue.
//!
//! Dropping the gateway aborts armed timers; call
//! [`PersistenceGateway::flush`] first to keep the last edits.

use crate::document::Document;
use crate::repository::{ElementUpdate, SectionRepository, SectionUpdate};
use pagecraft_model::{Element, ElementId, PageId, Section, SectionId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Debounce slot identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistKey {
    /// `{background, minHeight, config}` of a section
    Section(SectionId),
    /// Order of the sections of a page
    SectionOrder(PageId),
    /// Every persisted field of an element
    Element(ElementId),
    ElementPosition(ElementId),
    ElementSize(ElementId),
}

impl PersistKey {
    /// All keys that can carry writes for an element
    pub fn for_element(id: ElementId) -> [PersistKey; 3] {
        [
            PersistKey::Element(id),
            PersistKey::ElementPosition(id),
            PersistKey::ElementSize(id),
        ]
    }
}

impl fmt::Display for PersistKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistKey::Section(id) => write!(f, "section-{}", id),
            PersistKey::SectionOrder(id) => write!(f, "section-order-{}", id),
            PersistKey::Element(id) => write!(f, "element-{}", id),
            PersistKey::ElementPosition(id) => write!(f, "element-pos-{}", id),
            PersistKey::ElementSize(id) => write!(f, "element-size-{}", id),
        }
    }
}

impl PersistKey {
    fn entity(self) -> Entity {
        match self {
            PersistKey::Section(id) => Entity::Section(id),
            PersistKey::SectionOrder(id) => Entity::Page(id),
            PersistKey::Element(id) | PersistKey::ElementPosition(id) | PersistKey::ElementSize(id) => {
                Entity::Element(id)
            }
        }
    }
}

/// Record whose writes must stay in issue order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Entity {
    Page(PageId),
    Section(SectionId),
    Element(ElementId),
}

/// Per-entity write chain. Each entry is the completion signal of the
/// newest write of that entity: it resolves once the write's sender is
/// dropped.
#[derive(Default)]
struct Sequencer {
    tails: Mutex<HashMap<Entity, Tail>>,
    next_turn: AtomicU64,
}

struct Tail {
    turn: u64,
    done: watch::Receiver<()>,
}

impl Sequencer {
    fn lock(&self) -> MutexGuard<'_, HashMap<Entity, Tail>> {
        self.tails.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a write behind the current tail of every entity it touches
    fn enqueue(self: &Arc<Self>, entities: impl IntoIterator<Item = Entity>) -> Turn {
        let id = self.next_turn.fetch_add(1, Ordering::Relaxed);
        let mut tails = self.lock();
        let mut turn = Turn {
            id,
            sequencer: Arc::clone(self),
            previous: Vec::new(),
            held: Vec::new(),
        };
        for entity in entities {
            let (sender, done) = watch::channel(());
            if let Some(previous) = tails.insert(entity, Tail { turn: id, done }) {
                turn.previous.push(previous.done);
            }
            turn.held.push((entity, sender));
        }
        turn
    }

    /// Entities with a write still queued or in flight
    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// A write's place in its entities' chains
struct Turn {
    id: u64,
    sequencer: Arc<Sequencer>,
    previous: Vec<watch::Receiver<()>>,
    held: Vec<(Entity, watch::Sender<()>)>,
}

impl Turn {
    /// Wait until every earlier write of the same entities has finished
    async fn wait(&mut self) {
        for previous in &mut self.previous {
            // Errors once the earlier write dropped its sender
            let _ = previous.changed().await;
        }
    }
}

impl Drop for Turn {
    fn drop(&mut self) {
        let mut tails = self.sequencer.lock();
        for (entity, _) in &self.held {
            if tails.get(entity).is_some_and(|tail| tail.turn == self.id) {
                tails.remove(entity);
            }
        }
    }
}

struct PendingWrite {
    handle: JoinHandle<()>,
    /// Set once the timer elapsed and the write is on its way
    fired: Arc<AtomicBool>,
}

impl PendingWrite {
    fn is_armed(&self) -> bool {
        !self.fired.load(Ordering::SeqCst) && !self.handle.is_finished()
    }
}

pub struct PersistenceGateway {
    repository: Arc<dyn SectionRepository>,
    runtime: Handle,
    delay: Duration,
    state: watch::Receiver<Document>,
    pending: HashMap<PersistKey, PendingWrite>,
    in_flight: Vec<JoinHandle<()>>,
    sequencer: Arc<Sequencer>,
}

impl fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("delay", &self.delay)
            .field("pending", &self.pending.len())
            .field("in_flight", &self.in_flight.len())
            .field("ordered_entities", &self.sequencer.len())
            .finish()
    }
}

impl PersistenceGateway {
    pub fn new(
        repository: Arc<dyn SectionRepository>,
        runtime: Handle,
        delay: Duration,
        state: watch::Receiver<Document>,
    ) -> Self {
        Self {
            repository,
            runtime,
            delay,
            state,
            pending: HashMap::new(),
            in_flight: Vec::new(),
            sequencer: Arc::default(),
        }
    }

    /// (Re)arm the debounce timer for `key`
    pub fn schedule(&mut self, key: PersistKey) {
        self.prune();
        self.cancel(key);

        let fired = Arc::new(AtomicBool::new(false));
        let repository = Arc::clone(&self.repository);
        let state = self.state.clone();
        let delay = self.delay;
        let task_fired = Arc::clone(&fired);
        let sequencer = Arc::clone(&self.sequencer);

        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let mut turn = sequencer.enqueue([key.entity()]);
            task_fired.store(true, Ordering::SeqCst);

            turn.wait().await;
            let document = state.borrow().clone();
            write(repository.as_ref(), key, &document).await;
        });

        debug!(key = %key, delay_ms = delay.as_millis() as u64, "scheduled write");
        self.pending.insert(key, PendingWrite { handle, fired });
    }

    /// Cancel the pending timer for `key`. A write that already fired is
    /// left to complete.
    pub fn cancel(&mut self, key: PersistKey) -> bool {
        match self.pending.remove(&key) {
            Some(pending) if pending.is_armed() => {
                pending.handle.abort();
                debug!(key = %key, "cancelled pending write");
                true
            }
            Some(pending) => {
                self.in_flight.push(pending.handle);
                false
            }
            None => false,
        }
    }

    pub fn cancel_element(&mut self, id: ElementId) {
        for key in PersistKey::for_element(id) {
            self.cancel(key);
        }
    }

    pub fn cancel_section(&mut self, id: SectionId) {
        self.cancel(PersistKey::Section(id));
    }

    /// Cancel every armed timer
    pub fn cancel_all(&mut self) {
        let keys: Vec<PersistKey> = self.pending.keys().copied().collect();
        for key in keys {
            self.cancel(key);
        }
    }

    /// Create a section and then its elements
    pub fn create_section(&mut self, section: Section) {
        let entities = std::iter::once(Entity::Section(section.id))
            .chain(section.elements.iter().map(|el| Entity::Element(el.id)));
        let mut turn = self.sequencer.enqueue(entities);

        let repository = Arc::clone(&self.repository);
        self.spawn_now(async move {
            turn.wait().await;
            if let Err(e) = repository.create_section(&section).await {
                error!(section_id = %section.id, error = %e, "failed to create section");
                return;
            }
            for element in section.elements.iter() {
                if let Err(e) = repository.create_element(element).await {
                    error!(element_id = %element.id, error = %e, "failed to create element");
                }
            }
        });
    }

    pub fn create_element(&mut self, element: Element) {
        let mut turn = self.sequencer.enqueue([Entity::Element(element.id)]);

        let repository = Arc::clone(&self.repository);
        self.spawn_now(async move {
            turn.wait().await;
            if let Err(e) = repository.create_element(&element).await {
                error!(element_id = %element.id, error = %e, "failed to create element");
            }
        });
    }

    /// Delete a section remotely. The remote store drops its elements, so
    /// only their pending writes are cancelled here. The delete waits for
    /// in-flight writes of the section and of those elements.
    pub fn delete_section(&mut self, id: SectionId, element_ids: impl IntoIterator<Item = ElementId>) {
        self.cancel_section(id);
        let element_ids: Vec<ElementId> = element_ids.into_iter().collect();
        for element_id in &element_ids {
            self.cancel_element(*element_id);
        }

        let entities = std::iter::once(Entity::Section(id)).chain(element_ids.into_iter().map(Entity::Element));
        let mut turn = self.sequencer.enqueue(entities);

        let repository = Arc::clone(&self.repository);
        self.spawn_now(async move {
            turn.wait().await;
            match repository.delete_section(id).await {
                Ok(true) => {}
                Ok(false) => debug!(section_id = %id, "section was already gone remotely"),
                Err(e) => error!(section_id = %id, error = %e, "failed to delete section"),
            }
        });
    }

    /// Delete an element remotely, after any in-flight write of it
    pub fn delete_element(&mut self, id: ElementId) {
        self.cancel_element(id);
        let mut turn = self.sequencer.enqueue([Entity::Element(id)]);

        let repository = Arc::clone(&self.repository);
        self.spawn_now(async move {
            turn.wait().await;
            match repository.delete_element(id).await {
                Ok(true) => {}
                Ok(false) => debug!(element_id = %id, "element was already gone remotely"),
                Err(e) => error!(element_id = %id, error = %e, "failed to delete element"),
            }
        });
    }

    /// Number of armed debounce timers
    pub fn pending_count(&self) -> usize {
        self.pending.values().filter(|p| p.is_armed()).count()
    }

    /// Wait until every scheduled and in-flight write has completed
    pub async fn flush(&mut self) {
        let mut handles: Vec<JoinHandle<()>> = self.pending.drain().map(|(_, p)| p.handle).collect();
        handles.append(&mut self.in_flight);

        for handle in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!(error = %e, "persistence task panicked");
                }
            }
        }
    }

    fn spawn_now<F>(&mut self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.prune();
        let handle = self.runtime.spawn(future);
        self.in_flight.push(handle);
    }

    /// Abort every armed timer, returning how many were aborted
    fn abort_armed(&mut self) -> usize {
        let mut aborted = 0;
        for pending in self.pending.values() {
            if pending.is_armed() {
                pending.handle.abort();
                aborted += 1;
            }
        }
        aborted
    }

    fn prune(&mut self) {
        self.pending.retain(|_, p| !p.handle.is_finished());
        self.in_flight.retain(|h| !h.is_finished());
    }
}

impl Drop for PersistenceGateway {
    fn drop(&mut self) {
        let dropped = self.abort_armed();
        if dropped > 0 {
            warn!(dropped, "gateway dropped before flush, pending writes discarded");
        }
    }
}

/// Send the write for `key` using the entity's state in `document`
async fn write(repository: &dyn SectionRepository, key: PersistKey, document: &Document) {
    let result = match key {
        PersistKey::Section(id) => {
            let Some(section) = document.section(id) else {
                debug!(key = %key, "section no longer exists, skipping write");
                return;
            };
            repository.update_section(id, SectionUpdate::from_section(section)).await
        }
        PersistKey::SectionOrder(page_id) => {
            let ordered: Vec<SectionId> = document
                .sections
                .iter()
                .filter(|s| s.page_id == page_id)
                .map(|s| s.id)
                .collect();
            repository.reorder_sections(page_id, ordered).await
        }
        PersistKey::Element(id) | PersistKey::ElementPosition(id) | PersistKey::ElementSize(id) => {
            let Some(element) = document.element(id) else {
                debug!(key = %key, "element no longer exists, skipping write");
                return;
            };
            let update = match key {
                PersistKey::ElementPosition(_) => ElementUpdate::position(element),
                PersistKey::ElementSize(_) => ElementUpdate::size(element),
                _ => ElementUpdate::full(element),
            };
            repository.update_element(id, update).await
        }
    };

    match result {
        Ok(()) => debug!(key = %key, "write landed"),
        Err(e) => error!(key = %key, error = %e, "write failed, keeping local state"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        let id = ElementId::new();
        assert_eq!(PersistKey::Element(id).to_string(), format!("element-{}", id));
        assert_eq!(PersistKey::ElementPosition(id).to_string(), format!("element-pos-{}", id));
        assert_eq!(PersistKey::ElementSize(id).to_string(), format!("element-size-{}", id));

        let section = SectionId::new();
        assert_eq!(PersistKey::Section(section).to_string(), format!("section-{}", section));
    }

    #[tokio::test]
    async fn test_turns_wait_for_earlier_writes_of_the_same_entity() {
        let sequencer = Arc::new(Sequencer::default());
        let element = Entity::Element(ElementId::new());
        let other = Entity::Element(ElementId::new());

        let first = sequencer.enqueue([element]);
        let mut second = sequencer.enqueue([element]);
        let mut unrelated = sequencer.enqueue([other]);
        assert_eq!(sequencer.len(), 2);

        unrelated.wait().await;
        drop(unrelated);

        let waiting = tokio::spawn(async move {
            second.wait().await;
        });
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());

        drop(first);
        waiting.await.unwrap();
        assert_eq!(sequencer.len(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_turn_does_not_block_the_next() {
        let sequencer = Arc::new(Sequencer::default());
        let element = Entity::Element(ElementId::new());

        let abandoned = sequencer.enqueue([element]);
        let mut next = sequencer.enqueue([element]);
        drop(abandoned);

        next.wait().await;
        drop(next);
        assert_eq!(sequencer.len(), 0);
    }
}
