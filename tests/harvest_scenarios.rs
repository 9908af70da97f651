mod common;

use common::*;
use review_harvester::core::error::{ErrorKind, HarvestError};
use review_harvester::cookies::parse_cookie_jar;
use review_harvester::types::{FallbackReason, Rating, SurfaceOrigin, Termination};
use review_harvester::{HarvestOrchestrator, HarvestRequest};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const PRODUCT: &str = "https://smartstore.naver.com/shop/products/1234567890";

fn orchestrator(launcher: FakeLauncher) -> HarvestOrchestrator<FakeLauncher> {
    HarvestOrchestrator::new(launcher, Arc::new(test_config())).unwrap()
}

#[tokio::test(start_paused = true)]
async fn two_pages_with_overlap_yield_nine_unique_in_order() {
    let review = FakeSurface::new("review-frame", two_overlapping_pages());
    let session = FakeSession::with_frame(review.clone());
    let closed = session.closed.clone();
    let orch = orchestrator(FakeLauncher::new(session));

    let report = assert_ok!(orch.harvest(&HarvestRequest::new(PRODUCT, 2)).await);

    assert_eq!(report.count, 9);
    let nicknames: Vec<&str> = report.reviews.iter().map(|r| r.nickname.as_str()).collect();
    assert_eq!(
        nicknames,
        ["user1", "user2", "user3", "user4", "user5", "user6", "user7", "user8", "user9"]
    );
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.termination, Termination::LimitReached);
    assert!(matches!(report.surface, SurfaceOrigin::EmbeddedFrame { .. }));
    assert_eq!(report.reviews[0].rating, Rating::Text("5".into()));
    assert_eq!(report.reviews[0].option, "색상: 블랙");
    assert_eq!(report.reviews[0].content, "리뷰 본문 1번 입니다");

    assert_eq!(report.duplicates.len(), 1);
    let dup = &report.duplicates[0];
    assert_eq!((dup.first_seen.page, dup.first_seen.index), (1, 5));
    assert_eq!((dup.repeated_at.page, dup.repeated_at.index), (2, 1));
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    // only page 2 was requested; the limit stops before asking for 3
    assert_eq!(*review.clicked.lock().unwrap(), ["2"]);
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn missing_next_control_exhausts_before_limit() {
    let review = FakeSurface::new("review-frame", two_overlapping_pages());
    let orch = orchestrator(FakeLauncher::new(FakeSession::with_frame(review.clone())));

    let report = orch.harvest(&HarvestRequest::new(PRODUCT, 5)).await.unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.count, 9);
    assert_eq!(*review.clicked.lock().unwrap(), ["2", "3"]);
}

#[tokio::test(start_paused = true)]
async fn limit_of_one_reads_a_single_page() {
    let review = FakeSurface::new("review-frame", two_overlapping_pages());
    let orch = orchestrator(FakeLauncher::new(FakeSession::with_frame(review.clone())));

    let report = orch.harvest(&HarvestRequest::new(PRODUCT, 1)).await.unwrap();

    assert_eq!(report.count, 5);
    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.termination, Termination::LimitReached);
    assert!(review.clicked.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn denial_that_clears_after_the_window_continues() {
    let review = FakeSurface::new("review-frame", two_overlapping_pages())
        .script(vec![Ok(DENIAL_PAGE)]);
    let orch = orchestrator(FakeLauncher::new(FakeSession::with_frame(review)));

    let start = tokio::time::Instant::now();
    let report = orch.harvest(&HarvestRequest::new(PRODUCT, 2)).await.unwrap();

    assert_eq!(report.count, 9);
    assert!(start.elapsed() >= Duration::from_millis(30_000));
}

#[tokio::test(start_paused = true)]
async fn persistent_denial_is_fatal_and_closes_the_session() {
    let review = FakeSurface::new("review-frame", two_overlapping_pages())
        .script(vec![Ok(DENIAL_PAGE), Ok(DENIAL_PAGE)]);
    let session = FakeSession::with_frame(review);
    let closed = session.closed.clone();
    let orch = orchestrator(FakeLauncher::new(session));

    let err = assert_err!(orch.harvest(&HarvestRequest::new(PRODUCT, 2)).await);

    assert_eq!(err.kind(), ErrorKind::AccessBlocked);
    assert!(err.kind().is_fatal());
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn denial_on_the_product_page_is_screened_before_the_frame_search() {
    let review = FakeSurface::new("review-frame", two_overlapping_pages());
    let session = FakeSession::with_frame(review.clone());
    session.top.script(vec![Ok(DENIAL_PAGE), Ok(DENIAL_PAGE)]);
    let closed = session.closed.clone();
    let orch = orchestrator(FakeLauncher::new(session));

    let err = orch.harvest(&HarvestRequest::new(PRODUCT, 2)).await.unwrap_err();

    assert!(matches!(err, HarvestError::AccessBlocked { .. }));
    assert_eq!(review.html_reads.load(Ordering::SeqCst), 0);
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn navigation_failure_is_fatal() {
    let mut session = FakeSession::with_frame(FakeSurface::new("review-frame", vec![]));
    session.goto = Goto::Fail;
    let closed = session.closed.clone();
    let orch = orchestrator(FakeLauncher::new(session));

    let err = orch.harvest(&HarvestRequest::new(PRODUCT, 2)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NavigationFailed);
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn navigation_timeout_only_warns() {
    let review = FakeSurface::new("review-frame", two_overlapping_pages());
    let mut session = FakeSession::with_frame(review);
    session.goto = Goto::Hang;
    let orch = orchestrator(FakeLauncher::new(session));

    let report = orch.harvest(&HarvestRequest::new(PRODUCT, 2)).await.unwrap();

    assert_eq!(report.count, 9);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, ErrorKind::NavigationTimeout);
}

#[tokio::test(start_paused = true)]
async fn driver_load_deadline_degrades_like_a_timeout() {
    let review = FakeSurface::new("review-frame", two_overlapping_pages());
    let mut session = FakeSession::with_frame(review);
    session.goto = Goto::DriverDeadline;
    let closed = session.closed.clone();
    let orch = orchestrator(FakeLauncher::new(session));

    let report = assert_ok!(orch.harvest(&HarvestRequest::new(PRODUCT, 2)).await);

    assert_eq!(report.count, 9);
    assert_eq!(report.termination, Termination::LimitReached);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, ErrorKind::NavigationTimeout);
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn invisible_tab_falls_back_to_the_product_page() {
    let cards: Vec<String> = (1..=3)
        .map(|i| card(&format!("buyer{i}"), "24.10.01.", "배송 빨라요"))
        .collect();
    let mut session = FakeSession::with_frame(FakeSurface::new("review-frame", vec![]));
    session.tab_visible = false;
    session.top = FakeSurface::new("top-level", vec![page(&cards, 1)]);
    let orch = orchestrator(FakeLauncher::new(session));

    let report = orch.harvest(&HarvestRequest::new(PRODUCT, 3)).await.unwrap();

    assert_eq!(
        report.surface,
        SurfaceOrigin::TopLevel {
            reason: FallbackReason::ReviewTabNotFound
        }
    );
    assert_eq!(report.count, 3);
    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.warnings[0].kind, ErrorKind::SurfaceNotFound);
}

#[tokio::test(start_paused = true)]
async fn page_without_cards_stops_with_no_cards() {
    let review = FakeSurface::new("review-frame", vec![page(&[], 0)]);
    let orch = orchestrator(FakeLauncher::new(FakeSession::with_frame(review)));

    let report = orch.harvest(&HarvestRequest::new(PRODUCT, 3)).await.unwrap();

    assert_eq!(report.count, 0);
    assert_eq!(report.termination, Termination::NoCards);
}

#[tokio::test(start_paused = true)]
async fn unreadable_surface_keeps_what_was_collected() {
    let review = FakeSurface::new("review-frame", two_overlapping_pages());
    let orch = orchestrator(FakeLauncher::new(FakeSession::with_frame(review.clone())));
    // first read succeeds, the frame detaches after the click to page 2
    let first = two_overlapping_pages().remove(0);
    review.script(vec![Ok(first.as_str()), Err("frame detached")]);

    let report = orch.harvest(&HarvestRequest::new(PRODUCT, 3)).await.unwrap();

    assert_eq!(report.count, 5);
    assert_eq!(report.termination, Termination::SurfaceLost);
    assert_eq!(report.pages_visited, 2);
}

#[tokio::test(start_paused = true)]
async fn cards_missing_structure_are_kept_with_a_warning() {
    let bare = r#"<li class="IwcuBUIAKf"><div class="KqJ8Qqw082"><span>내용만 있음</span></div></li>"#;
    let review = FakeSurface::new("review-frame", vec![page(&[bare.to_string()], 1)]);
    let orch = orchestrator(FakeLauncher::new(FakeSession::with_frame(review)));

    let report = orch.harvest(&HarvestRequest::new(PRODUCT, 1)).await.unwrap();

    assert_eq!(report.count, 1);
    assert_eq!(report.reviews[0].nickname, "");
    assert_eq!(report.reviews[0].content, "내용만 있음");
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, ErrorKind::ParseFailure);
    assert!(report.warnings[0].detail.contains("nickname"));
}

#[tokio::test(start_paused = true)]
async fn launcher_failure_is_a_session_error() {
    let orch = orchestrator(FakeLauncher::broken());
    let err = orch.harvest(&HarvestRequest::new(PRODUCT, 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionError);
}

#[tokio::test(start_paused = true)]
async fn invalid_request_never_opens_a_browser() {
    let launcher = FakeLauncher::new(FakeSession::with_frame(FakeSurface::new("r", vec![])));
    let opened = launcher.opened.clone();
    let orch = orchestrator(launcher);

    let err = orch.harvest(&HarvestRequest::new("notaurl", 2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    let err = orch.harvest(&HarvestRequest::new(PRODUCT, 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(opened.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn cookies_reach_the_launcher() {
    let jar = parse_cookie_jar(
        r#"{"cookies": [{"name": "NID_AUT", "value": "x", "domain": ".naver.com", "sameSite": "no_restriction"}]}"#,
    )
    .unwrap();
    let review = FakeSurface::new("review-frame", two_overlapping_pages());
    let launcher = FakeLauncher::new(FakeSession::with_frame(review));
    let seen = launcher.cookies_seen.clone();
    let orch = orchestrator(launcher);

    orch.harvest(&HarvestRequest::new(PRODUCT, 1).with_cookies(jar))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].name, "NID_AUT");
    assert_eq!(seen[0].path, "/");
    assert_eq!(seen[0].same_site, review_harvester::cookies::SameSite::None);
}
