//! Ordered queue of pending outbound send requests.

use std::collections::VecDeque;
use std::net::IpAddr;

use crate::socket::{AfterSend, BeforeSend};

/// A single queued outbound packet.
///
/// Created on `send()`, owned by the queue until the scheduler dequeues it,
/// and dropped immediately after its completion runs.
pub(crate) struct SendRequest<T> {
    /// The caller's buffer holding the payload.
    pub(crate) buffer: Vec<u8>,
    /// Offset into `buffer` at which the payload starts.
    pub(crate) offset: usize,
    /// Number of payload bytes, starting at `offset`.
    pub(crate) length: usize,
    /// Destination IP address.
    pub(crate) destination: IpAddr,
    /// Hook run immediately before this request's OS send.
    pub(crate) before: Option<BeforeSend<T>>,
    /// Completion invoked with the outcome of the OS send.
    pub(crate) after: AfterSend<T>,
}

/// Ordered, unbounded queue of [SendRequest]s.
///
/// Owned exclusively by the socket and drained one request per send-ready
/// signal, in strict FIFO order. No reordering, no priorities.
pub(crate) struct SendQueue<T> {
    requests: VecDeque<SendRequest<T>>,
}

impl<T> SendQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            requests: VecDeque::new(),
        }
    }

    /// Appends a request to the tail of the queue.
    pub(crate) fn push(&mut self, request: SendRequest<T>) {
        self.requests.push_back(request);
    }

    /// Removes and returns the request at the head of the queue.
    pub(crate) fn pop(&mut self) -> Option<SendRequest<T>> {
        self.requests.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.requests.len()
    }

    /// Drops every queued request, returning how many were abandoned.
    ///
    /// Abandoned requests never see their completion run.
    pub(crate) fn clear(&mut self) -> usize {
        let abandoned = self.requests.len();
        self.requests.clear();

        abandoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(tag: usize) -> SendRequest<()> {
        SendRequest {
            buffer: vec![0; 16],
            offset: 0,
            length: tag,
            destination: "127.0.0.1".parse().unwrap(),
            before: None,
            after: Box::new(|_, _| {}),
        }
    }

    #[test]
    fn send_queue_fifo_order_valid() {
        let mut queue = SendQueue::new();

        for tag in 0..4 {
            queue.push(request(tag));
        }

        assert_eq!(queue.len(), 4);

        for tag in 0..4 {
            let req = queue.pop().expect("queue should not be empty");
            assert_eq!(req.length, tag);
        }

        assert_eq!(queue.len(), 0);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn send_queue_clear_counts_abandoned_valid() {
        let mut queue = SendQueue::new();

        for tag in 0..3 {
            queue.push(request(tag));
        }

        assert_eq!(queue.clear(), 3);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.clear(), 0);
    }
}
