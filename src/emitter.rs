//! 로컬 이벤트 이미터
//!
//! 타입 문자열별 핸들러 목록을 관리하는 bind/unbind/trigger 기본 구현.
//! 피어 프록시는 이 이미터를 내장하고 그 위에 원격 의미를 덧씌운다.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// 로컬 이벤트 핸들러
pub type Handler<A> = Arc<dyn Fn(&[A]) + Send + Sync>;

pub struct EventEmitter<A> {
    handlers: Mutex<HashMap<String, Vec<Handler<A>>>>,
}

impl<A> EventEmitter<A> {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    pub fn bind(&self, event_type: &str, handler: Handler<A>) {
        self.handlers
            .lock()
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    /// 동일한 핸들러(`Arc` 포인터 기준) 하나를 제거
    pub fn unbind(&self, event_type: &str, handler: &Handler<A>) -> bool {
        let mut handlers = self.handlers.lock();
        let Some(list) = handlers.get_mut(event_type) else {
            return false;
        };

        let Some(index) = list.iter().position(|h| Arc::ptr_eq(h, handler)) else {
            return false;
        };
        list.remove(index);

        if list.is_empty() {
            handlers.remove(event_type);
        }
        true
    }

    /// 핸들러 호출. 목록 스냅샷 후 락을 풀고 호출하므로 핸들러 안에서 재진입 가능.
    pub fn trigger(&self, event_type: &str, args: &[A]) -> usize {
        let snapshot: Vec<Handler<A>> = match self.handlers.lock().get(event_type) {
            Some(list) => list.clone(),
            None => return 0,
        };

        for handler in &snapshot {
            handler(args);
        }
        snapshot.len()
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .lock()
            .get(event_type)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl<A> Default for EventEmitter<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Handler<u32>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handler: Handler<u32> = Arc::new(move |args: &[u32]| {
            c.fetch_add(args.iter().sum::<u32>() as usize, Ordering::SeqCst);
        });
        (count, handler)
    }

    #[test]
    fn test_bind_and_trigger() {
        let emitter = EventEmitter::new();
        let (count, handler) = counter();

        emitter.bind("score", handler);
        assert_eq!(emitter.trigger("score", &[2, 3]), 1);
        assert_eq!(emitter.trigger("other", &[100]), 0);

        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_unbind_by_identity() {
        let emitter = EventEmitter::new();
        let (first_count, first) = counter();
        let (second_count, second) = counter();

        emitter.bind("score", first.clone());
        emitter.bind("score", second.clone());
        assert!(emitter.unbind("score", &first));
        assert!(!emitter.unbind("score", &first));

        emitter.trigger("score", &[1]);
        assert_eq!(first_count.load(Ordering::SeqCst), 0);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);

        assert!(emitter.unbind("score", &second));
        assert_eq!(emitter.handler_count("score"), 0);
    }

    #[test]
    fn test_handler_may_reenter_emitter() {
        let emitter = Arc::new(EventEmitter::<u32>::new());
        let (count, late) = counter();

        let e = emitter.clone();
        emitter.bind(
            "ping",
            Arc::new(move |_args: &[u32]| {
                e.bind("pong", late.clone());
                e.trigger("pong", &[1]);
            }),
        );

        emitter.trigger("ping", &[]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.handler_count("pong"), 1);
    }
}
