//! Black-box scenarios from spec.md §8 that need a live `MulticastService`
//! (real sockets, real interfaces). Like the teacher's own
//! `tests/resolver.rs`, these may be flaky in a sandbox without a usable
//! multicast-capable network interface.

use rustdns_sd::cfg::Config;
use rustdns_sd::discovery::{ServiceDiscovery, ServiceProfile};
use rustdns_sd::errors::Error;
use rustdns_sd::service::MulticastService;
use rustdns_sd::types::{Class, Message, Question, Type, RR};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

async fn started_service() -> MulticastService {
    let _ = env_logger::builder().is_test(true).try_init();

    let service = MulticastService::new(Config::default());
    service.start().await.expect("failed to start multicast service");
    service
}

// spec.md §8 scenario 4: announce() sends exactly two outbound answers,
// at least 1s apart.
#[tokio::test]
async fn announce_sends_twice_at_least_a_second_apart() {
    let service = started_service().await;
    let discovery = ServiceDiscovery::new(service.clone(), Config::default());

    let profile = ServiceProfile::new(
        "integration-host",
        "_sdtest._udp",
        1024,
        vec![IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))],
    );
    discovery.advertise(&profile);

    let start = tokio::time::Instant::now();
    discovery
        .announce(&profile)
        .await
        .expect("announce should succeed once started");
    let elapsed = start.elapsed();

    assert!(
        elapsed >= Duration::from_secs(1),
        "announce returned after {:?}, expected >= 1s between the two sends",
        elapsed
    );
}

// spec.md §8 scenario 5: a query carrying a 9000-octet NULL additional
// exceeds max_packet and is rejected before anything is sent.
#[tokio::test]
async fn oversize_additional_is_rejected_before_sending() {
    let service = started_service().await;

    let mut message = Message::new_query();
    message
        .questions
        .push(Question::new(rustdns_sd::Name::parse("oversize.local"), Type::A, Class::Internet));
    message.additionals.push(RR {
        name: rustdns_sd::Name::parse("oversize.local"),
        class: Class::Internet,
        cache_flush: false,
        ttl: Duration::from_secs(120),
        resource: rustdns_sd::Resource::Unknown {
            r#type: Type::Unknown(10), // NULL
            rdata: vec![0u8; 9000],
        },
    });

    let err = service
        .send_query_message(&message)
        .await
        .expect_err("a 9000-octet additional must not fit in any max_packet");

    match err {
        Error::PacketTooLarge { len, max } => assert!(len > max),
        other => panic!("expected PacketTooLarge, got {:?}", other),
    }
}

// spec.md §8 scenario 6: duplicate suppression inside vs. outside the
// recent-message window.
#[tokio::test]
async fn duplicate_answers_are_suppressed_only_within_the_window() {
    let service = started_service().await;

    let answer = || {
        let mut m = Message::new_answer();
        m.answers.push(RR {
            name: rustdns_sd::Name::parse("dup.local"),
            class: Class::Internet,
            cache_flush: true,
            ttl: Duration::from_secs(120),
            resource: rustdns_sd::Resource::A(Ipv4Addr::new(10, 0, 0, 1)),
        });
        m
    };

    service
        .send_answer(answer(), true)
        .await
        .expect("first send is never a duplicate");

    // Within the window (500ms < RECENT_MESSAGE_WINDOW of 1s): suppressed,
    // but still reports Ok since suppression isn't an error.
    tokio::time::sleep(Duration::from_millis(500)).await;
    service
        .send_answer(answer(), true)
        .await
        .expect("suppressed resend still returns Ok");

    // Past the window: transmitted again.
    tokio::time::sleep(Duration::from_millis(1000)).await;
    service
        .send_answer(answer(), true)
        .await
        .expect("resend past the window should succeed");
}
