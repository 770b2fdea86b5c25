//! Reply trees and display ordering for ticket messages
//!
//! Both views borrow the canonical message list, which stays in backend order.

use crate::models::Message;
use std::collections::{HashMap, HashSet};

/// A message together with its replies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageThread<'a> {
    pub message: &'a Message,
    pub replies: Vec<MessageThread<'a>>,
}

impl MessageThread<'_> {
    /// Number of messages in this thread, including the root
    #[must_use]
    pub fn message_count(&self) -> usize {
        1 + self
            .replies
            .iter()
            .map(MessageThread::message_count)
            .sum::<usize>()
    }

    /// Deepest reply chain, the root alone being depth 1
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.replies.iter().map(MessageThread::depth).max().unwrap_or(0)
    }
}

/// Build reply trees from `parent_id` links
///
/// Messages whose parent is absent from the list become roots. Each message
/// is placed at most once, so reply cycles cannot recurse forever; a cycle
/// that has no outside root is entered at its first message in list order.
#[must_use]
pub fn build_threads(messages: &[Message]) -> Vec<MessageThread<'_>> {
    let known: HashSet<u64> = messages.iter().filter_map(|m| m.id).collect();

    let mut children: HashMap<u64, Vec<usize>> = HashMap::new();
    let mut root_indices = Vec::new();
    for (index, message) in messages.iter().enumerate() {
        match message.parent_id {
            Some(parent) if known.contains(&parent) && message.id != Some(parent) => {
                children.entry(parent).or_default().push(index);
            }
            _ => root_indices.push(index),
        }
    }

    let mut placed = vec![false; messages.len()];
    let mut threads: Vec<MessageThread<'_>> = root_indices
        .into_iter()
        .filter_map(|index| attach(index, messages, &children, &mut placed))
        .collect();

    // Whatever is left sits on a cycle unreachable from any root
    for index in 0..messages.len() {
        if let Some(thread) = attach(index, messages, &children, &mut placed) {
            threads.push(thread);
        }
    }
    threads
}

fn attach<'a>(
    index: usize,
    messages: &'a [Message],
    children: &HashMap<u64, Vec<usize>>,
    placed: &mut [bool],
) -> Option<MessageThread<'a>> {
    if placed[index] {
        return None;
    }
    placed[index] = true;

    let message = &messages[index];
    let replies = message
        .id
        .and_then(|id| children.get(&id))
        .map(|indices| {
            indices
                .iter()
                .filter_map(|&child| attach(child, messages, children, placed))
                .collect()
        })
        .unwrap_or_default();

    Some(MessageThread { message, replies })
}

/// Messages oldest first, undated ones last, ties in list order
#[must_use]
pub fn sorted_by_time(messages: &[Message]) -> Vec<&Message> {
    let mut sorted: Vec<&Message> = messages.iter().collect();
    sorted.sort_by_key(|m| (m.created_at.is_none(), m.created_at));
    sorted
}
