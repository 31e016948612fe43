use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;

use super::checks::{count_escape_hatches, Prober};
use super::transport::Transport;
use crate::config::Settings;
use crate::discovery::{has_secret_file, ModuleTarget};
use crate::errors::ProbeError;
use crate::scoring::{Check, TestResult};

/// Results of a full grading run, sorted by category then module name.
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<TestResult>,
    /// Modules whose run was cut short (deadline or crash). Each still has an
    /// entry in `results`.
    pub module_failures: Vec<String>,
}

impl RunReport {
    pub fn zero_scores(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| r.total_score() == 0)
    }

    pub fn has_failures(&self) -> bool {
        !self.module_failures.is_empty() || self.zero_scores().next().is_some()
    }
}

/// Score a probe outcome. Errors count as a failed check.
fn settle(key: &str, check: Check, outcome: Result<bool, ProbeError>) -> bool {
    match outcome {
        Ok(passed) => {
            tracing::debug!(module = %key, check = %check, passed, "check finished");
            passed
        }
        Err(e) => {
            if e.is_timeout() {
                tracing::warn!(module = %key, check = %check, "probe timed out");
            } else {
                tracing::debug!(module = %key, check = %check, error = %e, "probe failed");
            }
            false
        }
    }
}

/// Run every rubric check against one module, strictly in order.
///
/// Checks are independent: a failed probe only fails its own check. Read,
/// update and delete are skipped when create produced no id.
pub async fn grade_module(
    transport: &dyn Transport,
    settings: &Settings,
    target: &ModuleTarget,
) -> TestResult {
    let key = target.key();
    let mut result = TestResult::new(target.category, target.name.clone());
    let module_dir = target.dir(&settings.modules_root);
    let prober = Prober::new(transport, target.category, &target.name);

    result.record(
        Check::SecretFile,
        has_secret_file(&module_dir, &settings.secret_file),
    );

    result.record(
        Check::PageRenders,
        settle(&key, Check::PageRenders, prober.page_renders().await),
    );

    let escape_hatches = count_escape_hatches(
        &module_dir,
        &settings.strictness_files,
        &settings.escape_hatch,
    );
    tracing::debug!(module = %key, escape_hatches, "static type scan");
    result.record(
        Check::TsStrictness,
        escape_hatches <= settings.max_escape_hatches,
    );

    result.record(Check::GetAll, settle(&key, Check::GetAll, prober.list().await));

    let created_id = match prober.create().await {
        Ok(id) => id,
        Err(e) => {
            settle(&key, Check::Create, Err(e));
            None
        }
    };
    result.record(Check::Create, created_id.is_some());

    match &created_id {
        Some(id) => {
            result.record(
                Check::GetById,
                settle(&key, Check::GetById, prober.get_by_id(id).await),
            );
            result.record(
                Check::Update,
                settle(&key, Check::Update, prober.update(id).await),
            );
            result.record(
                Check::Delete,
                settle(&key, Check::Delete, prober.delete(id).await),
            );
            if !result.delete {
                tracing::info!(module = %key, id = %id, "test record left behind");
            }
        }
        None => {
            tracing::debug!(module = %key, "create failed, skipping read/update/delete");
        }
    }

    result.record(
        Check::Validation,
        settle(&key, Check::Validation, prober.rejects_empty_name().await),
    );
    result.record(
        Check::NegativePrice,
        settle(&key, Check::NegativePrice, prober.rejects_negative_price().await),
    );
    result.record(
        Check::XssPrevention,
        settle(&key, Check::XssPrevention, prober.contains_xss().await),
    );
    result.record(
        Check::InvalidId,
        settle(&key, Check::InvalidId, prober.rejects_invalid_id().await),
    );

    result
}

/// Grade every target and collect the results.
///
/// Up to `settings.concurrency` modules run at once; probes for one module
/// never overlap. A module that exceeds `module_timeout` or crashes still gets
/// an all-failed result so the leaderboard stays complete.
pub async fn run_all(
    transport: Arc<dyn Transport>,
    settings: Arc<Settings>,
    targets: Vec<ModuleTarget>,
) -> RunReport {
    let mut report = RunReport::default();
    let mut futures = FuturesUnordered::new();
    let mut targets_iter = targets.into_iter();

    let spawn = |target: ModuleTarget| {
        let transport = transport.clone();
        let settings = settings.clone();
        async move {
            tracing::info!(module = %target.key(), "grading");
            let deadline = settings.module_timeout;
            let task_target = target.clone();
            let handle = tokio::spawn(async move {
                tokio::time::timeout(
                    deadline,
                    grade_module(transport.as_ref(), &settings, &task_target),
                )
                .await
            });
            (target, handle.await)
        }
    };

    // Fill initial batch
    for _ in 0..settings.concurrency.max(1) {
        if let Some(target) = targets_iter.next() {
            futures.push(spawn(target));
        }
    }

    while let Some((target, outcome)) = futures.next().await {
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(_elapsed)) => {
                tracing::error!(
                    module = %target.key(),
                    timeout = ?settings.module_timeout,
                    "module timed out"
                );
                report.module_failures.push(target.key());
                TestResult::new(target.category, target.name.clone())
            }
            Err(join_error) => {
                tracing::error!(module = %target.key(), error = %join_error, "module crashed");
                report.module_failures.push(target.key());
                TestResult::new(target.category, target.name.clone())
            }
        };
        tracing::info!(module = %result.key(), score = result.total_score(), "graded");
        report.results.push(result);

        if let Some(next) = targets_iter.next() {
            futures.push(spawn(next));
        }
    }

    report
        .results
        .sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.module.cmp(&b.module)));
    report.module_failures.sort();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::harness::{ProbeRequest, ProbeResponse};
    use crate::reference::Registry;
    use crate::scoring::Category;
    use async_trait::async_trait;
    use http::{Method, StatusCode};
    use serde_json::json;
    use std::path::Path;
    use std::time::Duration;

    fn settings(modules_root: &Path) -> Settings {
        let mut settings = Settings::resolve(&Config::default()).unwrap();
        settings.modules_root = modules_root.to_path_buf();
        settings
    }

    fn reference() -> Registry {
        Registry::with_inventory_modules(&[
            (Category::Fruits, "apple"),
            (Category::Fruits, "kiwi"),
            (Category::Vegetables, "leek"),
        ])
        .unwrap()
    }

    fn json_response(status: StatusCode, body: serde_json::Value) -> ProbeResponse {
        ProbeResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: body.to_string().into_bytes(),
        }
    }

    fn is_collection_post(request: &ProbeRequest) -> bool {
        request.method == Method::POST && request.segments.len() == 3
    }

    /// PUT replaces the whole record with the patch, dropping `name`.
    struct ClobberingUpdate(Registry);

    #[async_trait]
    impl Transport for ClobberingUpdate {
        async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, ProbeError> {
            if request.method == Method::PUT {
                let id = request.segments[3].clone();
                return Ok(json_response(
                    StatusCode::OK,
                    json!({
                        "success": true,
                        "data": { "_id": id, "price": 19.99, "quantity": 5 }
                    }),
                ));
            }
            self.0.send(request).await
        }
    }

    /// Accepts any POST body, including an empty name.
    struct NoValidation(Registry);

    #[async_trait]
    impl Transport for NoValidation {
        async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, ProbeError> {
            let empty_name = request
                .body
                .as_ref()
                .and_then(|b| b.get("name"))
                .and_then(|n| n.as_str())
                == Some("");
            if is_collection_post(&request) && empty_name {
                return Ok(json_response(
                    StatusCode::CREATED,
                    json!({
                        "success": true,
                        "data": { "_id": "0123456789abcdef01234567", "name": "" }
                    }),
                ));
            }
            self.0.send(request).await
        }
    }

    /// Escapes markup instead of rejecting it.
    struct SanitizingCreate(Registry);

    #[async_trait]
    impl Transport for SanitizingCreate {
        async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, ProbeError> {
            let name = request
                .body
                .as_ref()
                .and_then(|b| b.get("name"))
                .and_then(|n| n.as_str())
                .unwrap_or_default()
                .to_string();
            if is_collection_post(&request) && name.contains('<') {
                let escaped = name.replace('<', "&lt;").replace('>', "&gt;");
                return Ok(json_response(
                    StatusCode::CREATED,
                    json!({
                        "success": true,
                        "data": { "_id": "0123456789abcdef01234567", "name": escaped }
                    }),
                ));
            }
            self.0.send(request).await
        }
    }

    /// Looks up malformed ids instead of rejecting them.
    struct NotFoundForInvalidId(Registry);

    #[async_trait]
    impl Transport for NotFoundForInvalidId {
        async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, ProbeError> {
            let response = self.0.send(request).await?;
            if response.status == StatusCode::BAD_REQUEST
                && response.envelope().ok().and_then(|e| e.error).as_deref() == Some("Invalid id")
            {
                return Ok(json_response(
                    StatusCode::NOT_FOUND,
                    json!({ "success": false, "error": "Item not found" }),
                ));
            }
            Ok(response)
        }
    }

    /// Create always crashes; everything else works.
    struct BrokenCreate(Registry);

    #[async_trait]
    impl Transport for BrokenCreate {
        async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, ProbeError> {
            if request.method == Method::POST {
                return Ok(json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": "boom" }),
                ));
            }
            self.0.send(request).await
        }
    }

    struct TimesOut;

    #[async_trait]
    impl Transport for TimesOut {
        async fn send(&self, _request: ProbeRequest) -> Result<ProbeResponse, ProbeError> {
            Err(ProbeError::Timeout(Duration::from_secs(10)))
        }
    }

    /// Hangs on every probe for `fruits/kiwi`, delegates the rest.
    struct HangsOnKiwi(Registry);

    #[async_trait]
    impl Transport for HangsOnKiwi {
        async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, ProbeError> {
            if request.segments.iter().any(|s| s == "kiwi") {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            self.0.send(request).await
        }
    }

    fn checks_of(result: &TestResult) -> Vec<bool> {
        Check::ALL.iter().map(|c| result.passed(*c)).collect()
    }

    #[tokio::test]
    async fn test_reference_scores_full_marks() {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("fruits").join("apple");
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(module_dir.join("secret.txt"), "seed-42\n").unwrap();
        std::fs::write(module_dir.join("model.ts"), "let a: any; let b: any;").unwrap();

        let result = grade_module(
            &reference(),
            &settings(dir.path()),
            &ModuleTarget::new(Category::Fruits, "apple"),
        )
        .await;

        assert!(result.has_secret_file);
        assert!(result.ts_strictness);
        assert_eq!(result.total_score(), 100, "failed: {:?}", result.failed_checks());
    }

    #[tokio::test]
    async fn test_too_many_escape_hatches_costs_five() {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("vegetables").join("leek");
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(module_dir.join("api.ts"), "a: any; b: any; c: any; d: any;").unwrap();

        let result = grade_module(
            &reference(),
            &settings(dir.path()),
            &ModuleTarget::new(Category::Vegetables, "leek"),
        )
        .await;

        assert!(!result.has_secret_file);
        assert_eq!(result.failed_checks(), vec![Check::TsStrictness]);
        assert_eq!(result.total_score(), 95);
    }

    #[tokio::test]
    async fn test_grading_twice_gives_same_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let registry = reference();
        let settings = settings(dir.path());
        let target = ModuleTarget::new(Category::Fruits, "kiwi");

        let first = grade_module(&registry, &settings, &target).await;
        let second = grade_module(&registry, &settings, &target).await;

        assert_eq!(checks_of(&first), checks_of(&second));
        assert_eq!(first.total_score(), second.total_score());
    }

    #[tokio::test]
    async fn test_clobbering_update_fails_update_only() {
        let dir = tempfile::tempdir().unwrap();
        let result = grade_module(
            &ClobberingUpdate(reference()),
            &settings(dir.path()),
            &ModuleTarget::new(Category::Fruits, "apple"),
        )
        .await;

        assert!(result.create);
        assert!(!result.update);
        assert!(result.delete);
        assert_eq!(result.total_score(), 85);
    }

    #[tokio::test]
    async fn test_missing_validation_detected() {
        let dir = tempfile::tempdir().unwrap();
        let result = grade_module(
            &NoValidation(reference()),
            &settings(dir.path()),
            &ModuleTarget::new(Category::Fruits, "apple"),
        )
        .await;

        assert_eq!(result.failed_checks(), vec![Check::Validation]);
        assert!(result.negative_price);
    }

    #[tokio::test]
    async fn test_sanitized_xss_passes() {
        let dir = tempfile::tempdir().unwrap();
        let result = grade_module(
            &SanitizingCreate(reference()),
            &settings(dir.path()),
            &ModuleTarget::new(Category::Fruits, "apple"),
        )
        .await;

        assert!(result.xss_prevention);
        assert_eq!(result.total_score(), 100);
    }

    #[tokio::test]
    async fn test_invalid_id_must_be_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let result = grade_module(
            &NotFoundForInvalidId(reference()),
            &settings(dir.path()),
            &ModuleTarget::new(Category::Fruits, "apple"),
        )
        .await;

        assert_eq!(result.failed_checks(), vec![Check::InvalidId]);
        assert_eq!(result.total_score(), 90);
    }

    #[tokio::test]
    async fn test_failed_create_fails_dependents() {
        let dir = tempfile::tempdir().unwrap();
        let result = grade_module(
            &BrokenCreate(reference()),
            &settings(dir.path()),
            &ModuleTarget::new(Category::Fruits, "apple"),
        )
        .await;

        assert!(!result.create);
        assert!(!result.get_by_id && !result.update && !result.delete);
        assert!(result.dependencies_hold());
        assert!(result.get_all);
        assert!(result.invalid_id);
    }

    #[tokio::test]
    async fn test_timeouts_fail_checks_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let result = grade_module(
            &TimesOut,
            &settings(dir.path()),
            &ModuleTarget::new(Category::Vegetables, "leek"),
        )
        .await;

        assert_eq!(result.total_score(), 5);
        assert!(result.ts_strictness);
        assert!(result.dependencies_hold());
    }

    #[tokio::test]
    async fn test_run_all_sorts_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.concurrency = 3;

        let targets = vec![
            ModuleTarget::new(Category::Vegetables, "leek"),
            ModuleTarget::new(Category::Fruits, "kiwi"),
            ModuleTarget::new(Category::Fruits, "apple"),
        ];
        let report = run_all(Arc::new(reference()), Arc::new(settings), targets).await;

        let keys: Vec<String> = report.results.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["fruits/apple", "fruits/kiwi", "vegetables/leek"]);
        assert!(report.results.iter().all(|r| r.total_score() == 100));
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn test_module_timeout_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.module_timeout = Duration::from_millis(200);
        settings.concurrency = 2;

        let targets = vec![
            ModuleTarget::new(Category::Fruits, "kiwi"),
            ModuleTarget::new(Category::Fruits, "apple"),
        ];
        let report = run_all(Arc::new(HangsOnKiwi(reference())), Arc::new(settings), targets).await;

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].total_score(), 100);
        assert_eq!(report.results[1].key(), "fruits/kiwi");
        assert_eq!(report.results[1].total_score(), 0);
        assert_eq!(report.module_failures, vec!["fruits/kiwi".to_string()]);
        assert!(report.has_failures());
    }

    #[tokio::test]
    async fn test_unknown_module_only_passes_static_check() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_all(
            Arc::new(reference()),
            Arc::new(settings(dir.path())),
            vec![ModuleTarget::new(Category::Vegetables, "okra")],
        )
        .await;

        let result = &report.results[0];
        assert!(result.ts_strictness);
        assert_eq!(result.total_score(), Check::TsStrictness.points());
        assert!(report.module_failures.is_empty());
        assert_eq!(report.zero_scores().count(), 0);
    }
}
