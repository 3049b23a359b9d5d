use std::time::Duration;

use inpubsub::{fnv1_32, PubSub, PubSubConfig, PubSubError, Subscriber, TryReadError};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_millis(500);

async fn next<T>(sub: &mut Subscriber<T>) -> T {
    timeout(WAIT, sub.read())
        .await
        .expect("timed out")
        .expect("queue closed")
}

/// Waits until every request queued before this call has been applied.
async fn settle<T: Clone + Send + 'static>(ps: &PubSub<T>) {
    ps.topics().await.expect("engine closed");
}

/// Тест проверяет сценарий из примера: два подписчика на "t1",
/// один на "t2", без перекрёстной доставки.
#[tokio::test]
async fn test_end_to_end_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let ps = PubSub::new();

    let mut a = ps.subscribe("t1").await?;
    let mut b = ps.subscribe("t1").await?;
    let mut c = ps.subscribe("t2").await?;

    ps.publish("t1", "hi").await?;
    ps.publish("t2", "hello").await?;
    settle(&ps).await;

    assert_eq!(next(&mut a).await, "hi");
    assert_eq!(next(&mut b).await, "hi");
    assert_eq!(next(&mut c).await, "hello");

    assert_eq!(a.try_read(), Err(TryReadError::Empty));
    assert_eq!(b.try_read(), Err(TryReadError::Empty));
    assert_eq!(c.try_read(), Err(TryReadError::Empty));
    Ok(())
}

#[tokio::test]
async fn test_delivery_preserves_publish_order() {
    let ps = PubSub::new();
    let mut sub = ps.subscribe("seq").await.unwrap();

    for i in 0..100u32 {
        ps.publish("seq", i).await.unwrap();
    }

    for expected in 0..100u32 {
        assert_eq!(next(&mut sub).await, expected);
    }
}

#[tokio::test]
async fn test_fan_out_is_complete_and_independent() {
    let ps = PubSub::new();
    let mut subs = Vec::new();
    for _ in 0..5 {
        subs.push(ps.subscribe("fan").await.unwrap());
    }

    for i in 0..20u32 {
        ps.publish("fan", i).await.unwrap();
    }

    // drain one subscriber fully before touching the others
    for sub in subs.iter_mut() {
        let got: Vec<u32> = {
            let mut got = Vec::new();
            for _ in 0..20 {
                got.push(next(sub).await);
            }
            got
        };
        assert_eq!(got, (0..20).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_isolation_between_topics() {
    let ps = PubSub::new();
    let mut only_t1 = ps.subscribe("t1").await.unwrap();

    ps.publish("t2", "not for you").await.unwrap();
    ps.publish("t1", "for you").await.unwrap();
    settle(&ps).await;

    assert_eq!(next(&mut only_t1).await, "for you");
    assert_eq!(only_t1.try_read(), Err(TryReadError::Empty));
}

#[tokio::test]
async fn test_add_subscribe_receives_both_topics() {
    let ps = PubSub::new();
    let mut sub = ps.subscribe("t1").await.unwrap();
    assert!(ps.add_subscribe(&sub, "t2").await.unwrap());

    ps.publish("t1", "hi").await.unwrap();
    ps.publish("t2", "hello").await.unwrap();

    assert_eq!(next(&mut sub).await, "hi");
    assert_eq!(next(&mut sub).await, "hello");
}

/// Тест проверяет идемпотентность повторной подписки.
#[tokio::test]
async fn test_idempotent_subscribe() {
    let ps = PubSub::new();
    let mut sub = ps.subscribe("t").await.unwrap();

    assert!(!ps.add_subscribe(&sub, "t").await.unwrap());
    assert!(!ps.add_subscribe(&sub, "t").await.unwrap());
    assert_eq!(ps.subscriber_count("t").await.unwrap(), 1);

    ps.publish("t", "once").await.unwrap();
    settle(&ps).await;

    assert_eq!(next(&mut sub).await, "once");
    assert_eq!(sub.try_read(), Err(TryReadError::Empty));
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let ps = PubSub::new();
    let mut sub = ps.subscribe("t1").await.unwrap();
    ps.add_subscribe(&sub, "t2").await.unwrap();

    assert!(ps.unsubscribe("t1", &sub).await.unwrap());

    ps.publish("t1", "t1 - Hello World!!").await.unwrap();
    ps.publish("t2", "t2 - Hello World!!").await.unwrap();

    assert_eq!(next(&mut sub).await, "t2 - Hello World!!");
    settle(&ps).await;
    assert_eq!(sub.try_read(), Err(TryReadError::Empty));
}

#[tokio::test]
async fn test_enqueued_messages_survive_unsubscribe() {
    let ps = PubSub::new();
    let mut sub = ps.subscribe("t").await.unwrap();

    ps.publish("t", 1).await.unwrap();
    ps.publish("t", 2).await.unwrap();
    assert!(ps.unsubscribe("t", &sub).await.unwrap());
    ps.publish("t", 3).await.unwrap();
    settle(&ps).await;

    assert_eq!(next(&mut sub).await, 1);
    assert_eq!(next(&mut sub).await, 2);
    assert_eq!(sub.try_read(), Err(TryReadError::Empty));
    assert!(!ps.unsubscribe("t", &sub).await.unwrap());
}

#[tokio::test]
async fn test_unsubscribe_one_keeps_others() {
    let ps = PubSub::new();
    let a = ps.subscribe("t").await.unwrap();
    let mut b = ps.subscribe("t").await.unwrap();
    let mut c = ps.subscribe("t").await.unwrap();

    ps.unsubscribe("t", &a).await.unwrap();
    ps.publish("t", "x").await.unwrap();

    assert_eq!(next(&mut b).await, "x");
    assert_eq!(next(&mut c).await, "x");

    // positions were rewritten: removing c now must not hit b
    ps.unsubscribe("t", &c).await.unwrap();
    ps.publish("t", "y").await.unwrap();
    assert_eq!(next(&mut b).await, "y");
    settle(&ps).await;
    assert_eq!(c.try_read(), Err(TryReadError::Empty));
}

#[tokio::test]
async fn test_unknown_topic_publish_is_noop() {
    let ps = PubSub::<&str>::new();
    ps.publish("ghost", "boo").await.unwrap();
    settle(&ps).await;
    assert!(ps.topics().await.unwrap().is_empty());
    assert_eq!(ps.stats().unrouted, 1);
}

#[tokio::test]
async fn test_empty_topic_never_crashes() {
    let ps = PubSub::new();
    let sub = ps.subscribe("").await.unwrap();
    ps.publish("", "void").await.unwrap();
    assert!(!ps.unsubscribe("", &sub).await.unwrap());
    assert!(!ps.add_subscribe(&sub, "").await.unwrap());
    assert_eq!(ps.subscriber_count("").await.unwrap(), 0);
}

#[test]
fn test_hash_determinism() {
    assert_eq!(fnv1_32("abc"), 1_134_309_195);
    assert_eq!(fnv1_32("abc"), fnv1_32("abc"));
}

#[tokio::test]
async fn test_topic_capacity_is_reported() {
    let config = PubSubConfig::builder().topic_capacity(2).build();
    let ps = PubSub::<u8>::start(config).unwrap();
    let sub = ps.subscribe("a").await.unwrap();
    ps.add_subscribe(&sub, "b").await.unwrap();

    assert_eq!(
        ps.add_subscribe(&sub, "c").await,
        Err(PubSubError::TopicCapacityExceeded { capacity: 2 })
    );
    assert!(matches!(
        ps.subscribe("c").await,
        Err(PubSubError::TopicCapacityExceeded { capacity: 2 })
    ));
}

/// Тест проверяет политику сжатия через публичный API: после массовой
/// отписки срабатывает перераспределение памяти слота.
#[tokio::test]
async fn test_shrink_after_mass_unsubscribe() {
    let ps = PubSub::<u8>::new();
    let mut subs = Vec::new();
    for _ in 0..250 {
        subs.push(ps.subscribe("crowd").await.unwrap());
    }

    for sub in &subs[..200] {
        assert!(ps.unsubscribe("crowd", sub).await.unwrap());
    }
    settle(&ps).await;

    assert_eq!(ps.subscriber_count("crowd").await.unwrap(), 50);
    // 250 entries grew the slot 100 -> 200 -> 400; it shrinks to 200 at 199
    // entries and to the baseline at 99, then stays put
    assert_eq!(ps.stats().shrinks, 2);
}

#[tokio::test]
async fn test_dropped_subscriber_is_forgotten() {
    let ps = PubSub::new();
    let gone = ps.subscribe("t").await.unwrap();
    let mut kept = ps.subscribe("t").await.unwrap();
    drop(gone);

    ps.publish("t", "still here").await.unwrap();
    assert_eq!(next(&mut kept).await, "still here");

    assert_eq!(ps.subscriber_count("t").await.unwrap(), 1);
    assert_eq!(ps.stats().reaped, 1);
}

/// Тест проверяет обратное давление: полная очередь задерживает доставку,
/// но ничего не теряется.
#[tokio::test]
async fn test_backpressure_delays_but_does_not_drop() {
    let config = PubSubConfig::builder().queue_capacity(2).build();
    let ps = PubSub::start(config).unwrap();
    let mut slow = ps.subscribe("t").await.unwrap();

    let producer = {
        let ps = ps.clone();
        tokio::spawn(async move {
            for i in 0..10u32 {
                ps.publish("t", i).await.unwrap();
            }
        })
    };

    let mut got = Vec::new();
    for _ in 0..10 {
        got.push(next(&mut slow).await);
    }
    timeout(WAIT, producer).await.unwrap().unwrap();

    assert_eq!(got, (0..10).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_concurrent_publishers() {
    let ps = PubSub::new();
    let mut sub = ps.subscribe("many").await.unwrap();

    let tasks: Vec<_> = (0..4u32)
        .map(|p| {
            let ps = ps.clone();
            tokio::spawn(async move {
                for i in 0..25u32 {
                    ps.publish("many", p * 100 + i).await.unwrap();
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let mut got = Vec::new();
    for _ in 0..100 {
        got.push(next(&mut sub).await);
    }

    // per-publisher order is kept
    for p in 0..4u32 {
        let from_p: Vec<_> = got.iter().filter(|v| **v / 100 == p).copied().collect();
        assert_eq!(from_p, (0..25).map(|i| p * 100 + i).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_shutdown_drains_and_closes() {
    let config = PubSubConfig::builder().inbox_capacity(8).build();
    let ps = PubSub::start(config).unwrap();
    let mut sub = ps.subscribe("t").await.unwrap();

    for i in 0..5u32 {
        ps.publish("t", i).await.unwrap();
    }
    ps.shutdown().await.unwrap();

    for expected in 0..5u32 {
        assert_eq!(next(&mut sub).await, expected);
    }
    assert_eq!(timeout(WAIT, sub.read()).await.unwrap(), None);
    assert!(ps.is_closed());
    assert_eq!(ps.publish("t", 9).await, Err(PubSubError::Closed));
}

#[tokio::test]
async fn test_shutdown_drain_is_bounded() {
    let config = PubSubConfig::builder()
        .queue_capacity(1)
        .inbox_capacity(4)
        .drain_timeout(Duration::from_millis(50))
        .build();
    let ps = PubSub::start(config).unwrap();
    // not read until after shutdown: the second message stalls delivery
    let mut stuck = ps.subscribe("t").await.unwrap();

    ps.publish("t", 1u8).await.unwrap();
    ps.publish("t", 2u8).await.unwrap();
    ps.publish("t", 3u8).await.unwrap();

    let stopped = timeout(Duration::from_secs(2), ps.shutdown()).await;
    assert_eq!(stopped.expect("drain deadline not honoured"), Ok(()));

    assert_eq!(next(&mut stuck).await, 1);
    assert_eq!(timeout(WAIT, stuck.read()).await.unwrap(), None);
    assert!(ps.is_closed());
}

#[test]
fn test_blocking_reader_thread() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ps = rt.block_on(async { PubSub::<String>::new() });
    let mut sub = rt.block_on(ps.subscribe("t")).unwrap();

    let reader = std::thread::spawn(move || {
        let mut got = Vec::new();
        while let Some(message) = sub.blocking_read() {
            got.push(message);
        }
        got
    });

    rt.block_on(async {
        ps.publish("t", "a".to_string()).await.unwrap();
        ps.publish("t", "b".to_string()).await.unwrap();
        ps.shutdown().await.unwrap();
    });

    assert_eq!(reader.join().unwrap(), vec!["a".to_string(), "b".to_string()]);
}
