//! MessageBus: a typed publish/subscribe registry built on [`DenseMap`].
//!
//! Topics are message types. Each topic maps to the ordered list of its
//! handlers; registering uses the map's upsert and publishing walks the
//! list. Subscriptions are generational `slotmap` keys, so a cancelled
//! subscription never aliases a later one.

use crate::dense_map::DenseMap;
use crate::error::SubscriptionError;
use crate::sentinel::SentinelKey;
use core::any::{Any, TypeId};
use core::fmt;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    struct SubscriptionKey;
}

/// Identifies a topic: the `TypeId` of its message type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TopicId(TypeId);

impl TopicId {
    pub fn of<T: 'static>() -> Self {
        TopicId(TypeId::of::<T>())
    }
}

impl SentinelKey for TopicId {
    fn empty() -> Self {
        TopicId(TypeId::empty())
    }

    fn tombstone() -> Self {
        TopicId(TypeId::tombstone())
    }
}

/// Handle returned by [`MessageBus::subscribe`]; pass it to
/// [`MessageBus::unsubscribe`] to cancel.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Subscription {
    key: SubscriptionKey,
}

type Handler = Box<dyn Fn(&dyn Any)>;

struct Registration {
    key: SubscriptionKey,
    handler: Handler,
}

/// Single-threaded typed message bus.
#[derive(Default)]
pub struct MessageBus {
    topics: DenseMap<TopicId, Vec<Registration>>,
    subscriptions: SlotMap<SubscriptionKey, TopicId>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for messages of type `T`. Handlers of one topic
    /// run in subscription order.
    pub fn subscribe<T, F>(&mut self, handler: F) -> Subscription
    where
        T: 'static,
        F: Fn(&T) + 'static,
    {
        let topic = TopicId::of::<T>();
        let key = self.subscriptions.insert(topic);
        let handler: Handler = Box::new(move |message: &dyn Any| {
            if let Some(message) = message.downcast_ref::<T>() {
                handler(message);
            }
        });
        self.topics
            .get_or_insert_default(topic)
            .push(Registration { key, handler });
        #[cfg(feature = "logging")]
        log::trace!(
            "subscribed {key:?} to {}",
            core::any::type_name::<T>()
        );
        Subscription { key }
    }

    /// Cancels a subscription. A topic left without handlers is erased.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> Result<(), SubscriptionError> {
        let key = subscription.key;
        let topic = self
            .subscriptions
            .remove(key)
            .ok_or(SubscriptionError::Unknown)?;
        let now_empty = match self.topics.get_mut(&topic) {
            Some(registrations) => {
                registrations.retain(|r| r.key != key);
                registrations.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.topics.erase(&topic);
        }
        #[cfg(feature = "logging")]
        log::trace!("unsubscribed {key:?}");
        Ok(())
    }

    /// Delivers `message` to every handler of topic `T` and returns how
    /// many ran. Publishing to a topic without handlers creates nothing.
    pub fn publish<T: 'static>(&self, message: &T) -> usize {
        let Some(registrations) = self.topics.get(&TopicId::of::<T>()) else {
            return 0;
        };
        for registration in registrations {
            (registration.handler)(message);
        }
        #[cfg(feature = "logging")]
        log::trace!(
            "published {} to {} handlers",
            core::any::type_name::<T>(),
            registrations.len()
        );
        registrations.len()
    }

    pub fn subscriber_count<T: 'static>(&self) -> usize {
        self.topics
            .get(&TopicId::of::<T>())
            .map_or(0, |registrations| registrations.len())
    }

    /// Number of topics with at least one handler.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn is_subscribed(&self, subscription: Subscription) -> bool {
        self.subscriptions.contains_key(subscription.key)
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus")
            .field("topics", &self.topics.len())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
