//! # Flowgate Gateway
//!
//! Holds the registry of configured endpoints, resolves adapters by
//! protocol tag, enforces tenant ownership, and routes one request at a
//! time to completion. Every outcome, including the early-rejection
//! cases, lands in the audit trail before returning, so failed routes
//! are observable identically to successful ones.
//!
//! ## Routing ladder
//!
//! ```text
//! route_request
//!   ├── endpoint exists?        no -> 404
//!   ├── caller owns endpoint?   no -> 403 (adapter never invoked)
//!   ├── endpoint active?        no -> 503
//!   ├── adapter registered?     no -> 501
//!   └── adapter.send -> audit + REQUEST_PROCESSED event
//! ```

pub mod audit;

pub use audit::{AuditEntry, AuditLog};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use flowgate_adapters::{AdapterRegistry, HealthReport};
use flowgate_core::event::data_keys;
use flowgate_core::prelude::*;
use flowgate_core::{GatewayMetrics, GatewaySettings};
use flowgate_monitor::MonitorHandle;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Integration gateway: endpoint registry plus request router
pub struct IntegrationGateway {
    settings: GatewaySettings,
    endpoints: DashMap<Uuid, Endpoint>,
    audit: AuditLog,
    adapters: Arc<AdapterRegistry>,
    tenants: Arc<dyn TenantProvider>,
    monitor: MonitorHandle,
    metrics: GatewayMetrics,
}

impl IntegrationGateway {
    pub fn new(
        settings: GatewaySettings,
        adapters: Arc<AdapterRegistry>,
        tenants: Arc<dyn TenantProvider>,
        monitor: MonitorHandle,
    ) -> Self {
        Self {
            audit: AuditLog::new(settings.audit_capacity),
            settings,
            endpoints: DashMap::new(),
            adapters,
            tenants,
            monitor,
            metrics: GatewayMetrics::new(),
        }
    }

    /// Register an endpoint after adapter validation
    ///
    /// Fails closed: any validation failure leaves the registry untouched.
    pub async fn register_endpoint(&self, mut endpoint: Endpoint) -> Result<Uuid> {
        endpoint.tenant = self.tenants.current_tenant();
        endpoint.created_at = Utc::now();

        let adapter = self
            .adapters
            .resolve_protocol(endpoint.protocol)
            .ok_or_else(|| FlowgateError::unsupported_protocol(endpoint.protocol.as_tag()))?;

        adapter.validate_endpoint(&endpoint).await?;

        let id = endpoint.id;
        info!(
            endpoint = %id,
            name = %endpoint.name,
            protocol = %endpoint.protocol,
            "endpoint registered"
        );
        self.monitor.emit(
            IntegrationEvent::new(
                EventKind::EndpointRegistered,
                endpoint.tenant.clone(),
                format!("endpoint '{}' registered", endpoint.name),
            )
            .for_endpoint(id)
            .with_data(data_keys::PROTOCOL, endpoint.protocol.as_tag()),
        );

        self.endpoints.insert(id, endpoint);
        self.metrics.set_endpoint_count(self.endpoints.len());
        Ok(id)
    }

    /// Remove an endpoint from the live registry
    ///
    /// Historical events retain the endpoint id.
    pub fn unregister_endpoint(&self, id: Uuid) -> Result<()> {
        let tenant = self.tenants.current_tenant();
        let owned = self.owned_endpoint(id, &tenant)?;

        self.endpoints.remove(&id);
        self.metrics.set_endpoint_count(self.endpoints.len());
        info!(endpoint = %id, name = %owned.name, "endpoint unregistered");
        self.monitor.emit(
            IntegrationEvent::new(
                EventKind::EndpointUnregistered,
                tenant,
                format!("endpoint '{}' unregistered", owned.name),
            )
            .for_endpoint(id),
        );
        Ok(())
    }

    /// Route one request to completion
    ///
    /// Never returns an error: each failed check folds into a typed
    /// rejection response carrying its synthetic status.
    pub async fn route_request(&self, mut request: OutboundRequest) -> OutboundResponse {
        request.tenant = self.tenants.current_tenant();
        let start = Instant::now();

        let endpoint = match self.endpoints.get(&request.endpoint_id) {
            Some(e) => e.clone(),
            None => {
                return self
                    .reject(&request, FlowgateError::not_found("endpoint"), start)
                    .await;
            }
        };

        if endpoint.tenant != request.tenant {
            return self
                .reject(&request, FlowgateError::access_denied("endpoint"), start)
                .await;
        }

        if !endpoint.active {
            return self
                .reject(&request, FlowgateError::unavailable("endpoint"), start)
                .await;
        }

        let adapter = match self.adapters.resolve_protocol(endpoint.protocol) {
            Some(a) => a,
            None => {
                return self
                    .reject(
                        &request,
                        FlowgateError::unsupported_protocol(endpoint.protocol.as_tag()),
                        start,
                    )
                    .await;
            }
        };

        let response = adapter
            .send(&request, &endpoint)
            .await
            .with_duration(start.elapsed().as_millis() as u64);

        debug!(
            request = %request.id,
            endpoint = %endpoint.id,
            status = response.status,
            success = response.success,
            "request routed"
        );

        self.audit
            .push(AuditEntry::from_exchange(&request, &response))
            .await;

        let outcome = if response.success { "success" } else { "failure" };
        self.metrics.record_request(endpoint.protocol.as_tag(), outcome);
        self.metrics
            .record_duration(endpoint.protocol.as_tag(), start.elapsed());

        let mut event = IntegrationEvent::new(
            EventKind::RequestProcessed,
            request.tenant.clone(),
            format!("{} {} -> {}", request.method, request.path, response.status),
        )
        .for_endpoint(endpoint.id)
        .with_data(data_keys::SUCCESS, response.success)
        .with_data(data_keys::STATUS, response.status)
        .with_data(data_keys::PROCESSING_TIME_MS, response.duration_ms);
        if !response.success {
            event = event.error();
        }
        self.monitor.emit(event);

        response
    }

    /// Probe an endpoint's health and cache the result on the endpoint
    pub async fn check_endpoint_health(&self, id: Uuid) -> Result<HealthReport> {
        let tenant = self.tenants.current_tenant();
        let endpoint = self.owned_endpoint(id, &tenant)?;

        let adapter = self
            .adapters
            .resolve_protocol(endpoint.protocol)
            .ok_or_else(|| FlowgateError::unsupported_protocol(endpoint.protocol.as_tag()))?;

        let report = adapter.check_health(&endpoint).await;
        self.metrics
            .record_health_check(if report.healthy { "healthy" } else { "unhealthy" });

        if let Some(mut entry) = self.endpoints.get_mut(&id) {
            entry.record_health(report.healthy);
        }

        if !report.healthy {
            warn!(endpoint = %id, "endpoint reported unhealthy");
        }
        Ok(report)
    }

    /// Activate or deactivate an endpoint without unregistering it
    pub fn set_endpoint_active(&self, id: Uuid, active: bool) -> Result<()> {
        let tenant = self.tenants.current_tenant();
        self.owned_endpoint(id, &tenant)?;

        if let Some(mut entry) = self.endpoints.get_mut(&id) {
            entry.active = active;
        }
        info!(endpoint = %id, active, "endpoint activation changed");
        Ok(())
    }

    /// The caller's registered endpoints
    pub fn list_endpoints(&self) -> Vec<Endpoint> {
        let tenant = self.tenants.current_tenant();
        let mut endpoints: Vec<Endpoint> = self
            .endpoints
            .iter()
            .filter(|e| e.tenant == tenant)
            .map(|e| e.clone())
            .collect();
        endpoints.sort_by_key(|e| e.created_at);
        endpoints
    }

    /// Fetch a single endpoint, tenant-checked
    pub fn get_endpoint(&self, id: Uuid) -> Result<Endpoint> {
        let tenant = self.tenants.current_tenant();
        self.owned_endpoint(id, &tenant)
    }

    /// The most recent tenant-scoped audit entries, newest first
    pub async fn get_logs(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<AuditEntry> {
        let tenant = self.tenants.current_tenant();
        self.audit
            .query(&tenant, from, to, self.settings.log_query_limit)
            .await
    }

    fn owned_endpoint(&self, id: Uuid, tenant: &TenantId) -> Result<Endpoint> {
        let endpoint = self
            .endpoints
            .get(&id)
            .ok_or_else(|| FlowgateError::not_found("endpoint"))?;
        if &endpoint.tenant != tenant {
            return Err(FlowgateError::access_denied("endpoint"));
        }
        Ok(endpoint.clone())
    }

    /// Reject a request, audit the outcome, and fold the error into a
    /// typed response
    async fn reject(
        &self,
        request: &OutboundRequest,
        error: FlowgateError,
        start: Instant,
    ) -> OutboundResponse {
        warn!(request = %request.id, error = %error, "request rejected");
        let response = OutboundResponse::rejected(request.id, &error)
            .with_duration(start.elapsed().as_millis() as u64);

        self.audit
            .push(AuditEntry::from_exchange(request, &response))
            .await;
        self.metrics.record_request("none", "rejected");
        response
    }

    #[cfg(test)]
    fn insert_endpoint_unchecked(&self, endpoint: Endpoint) {
        self.endpoints.insert(endpoint.id, endpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flowgate_adapters::ProtocolAdapter;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Adapter double: records invocations, returns a canned response
    struct MockAdapter {
        protocol: Protocol,
        invoked: Arc<AtomicUsize>,
        fail_validation: AtomicBool,
    }

    impl MockAdapter {
        fn new(protocol: Protocol) -> (Self, Arc<AtomicUsize>) {
            let invoked = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    protocol,
                    invoked: invoked.clone(),
                    fail_validation: AtomicBool::new(false),
                },
                invoked,
            )
        }
    }

    #[async_trait]
    impl ProtocolAdapter for MockAdapter {
        fn protocol(&self) -> Protocol {
            self.protocol
        }

        async fn send(&self, request: &OutboundRequest, _endpoint: &Endpoint) -> OutboundResponse {
            self.invoked.fetch_add(1, Ordering::SeqCst);
            OutboundResponse::ok(request.id, 200, "{\"id\":1}")
        }

        async fn validate_endpoint(&self, _endpoint: &Endpoint) -> Result<()> {
            if self.fail_validation.load(Ordering::SeqCst) {
                Err(FlowgateError::config("invalid endpoint"))
            } else {
                Ok(())
            }
        }

        async fn check_health(&self, _endpoint: &Endpoint) -> HealthReport {
            HealthReport::unhealthy(5, "probe failed")
        }
    }

    /// Tenant provider whose tenant can be swapped mid-test
    struct SwitchTenant {
        current: Mutex<TenantId>,
    }

    impl SwitchTenant {
        fn new(tenant: &str) -> Arc<Self> {
            Arc::new(Self {
                current: Mutex::new(TenantId::new(tenant)),
            })
        }

        fn switch(&self, tenant: &str) {
            *self.current.lock().unwrap() = TenantId::new(tenant);
        }
    }

    impl TenantProvider for SwitchTenant {
        fn current_tenant(&self) -> TenantId {
            self.current.lock().unwrap().clone()
        }
    }

    fn gateway_with_mock() -> (IntegrationGateway, Arc<SwitchTenant>, Arc<AtomicUsize>) {
        let (adapter, invoked) = MockAdapter::new(Protocol::Rest);
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(adapter));

        let tenants = SwitchTenant::new("acme");
        let gateway = IntegrationGateway::new(
            GatewaySettings::default(),
            Arc::new(registry),
            tenants.clone(),
            MonitorHandle::disconnected(),
        );
        (gateway, tenants, invoked)
    }

    fn rest_endpoint() -> Endpoint {
        Endpoint::new("ignored", "svc", "https://svc.example/api", Protocol::Rest)
    }

    #[tokio::test]
    async fn test_register_and_route() {
        let (gateway, _, invoked) = gateway_with_mock();
        let id = gateway.register_endpoint(rest_endpoint()).await.unwrap();

        let response = gateway
            .route_request(OutboundRequest::new(id, "GET", "/widgets/1"))
            .await;

        assert!(response.success);
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "{\"id\":1}");
        assert_eq!(invoked.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.get_logs(None, None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_registration_stamps_caller_tenant() {
        let (gateway, _, _) = gateway_with_mock();
        let id = gateway.register_endpoint(rest_endpoint()).await.unwrap();
        let endpoint = gateway.get_endpoint(id).unwrap();
        assert_eq!(endpoint.tenant, TenantId::new("acme"));
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_404() {
        let (gateway, _, invoked) = gateway_with_mock();
        let response = gateway
            .route_request(OutboundRequest::new(Uuid::new_v4(), "GET", "/"))
            .await;
        assert!(!response.success);
        assert_eq!(response.status, 404);
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        // rejection is audited too
        assert_eq!(gateway.get_logs(None, None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_cross_tenant_route_is_403_and_never_invokes_adapter() {
        let (gateway, tenants, invoked) = gateway_with_mock();
        let id = gateway.register_endpoint(rest_endpoint()).await.unwrap();

        tenants.switch("rival");
        let response = gateway
            .route_request(OutboundRequest::new(id, "GET", "/widgets/1"))
            .await;

        assert!(!response.success);
        assert_eq!(response.status, 403);
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_inactive_endpoint_is_503() {
        let (gateway, _, invoked) = gateway_with_mock();
        let id = gateway.register_endpoint(rest_endpoint()).await.unwrap();
        gateway.set_endpoint_active(id, false).unwrap();

        let response = gateway
            .route_request(OutboundRequest::new(id, "GET", "/"))
            .await;
        assert_eq!(response.status, 503);
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_adapter_is_501() {
        let (gateway, _, _) = gateway_with_mock();
        // bypass registration to simulate an adapter withdrawn after the
        // endpoint entered the registry
        let mut endpoint = Endpoint::new("acme", "legacy", "https://soap.example", Protocol::Soap);
        endpoint.tenant = TenantId::new("acme");
        let id = endpoint.id;
        gateway.insert_endpoint_unchecked(endpoint);

        let response = gateway
            .route_request(OutboundRequest::new(id, "GetOrder", ""))
            .await;
        assert_eq!(response.status, 501);
    }

    #[tokio::test]
    async fn test_registration_fails_closed_on_validation_error() {
        let (adapter, _) = MockAdapter::new(Protocol::Rest);
        adapter.fail_validation.store(true, Ordering::SeqCst);
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(adapter));

        let gateway = IntegrationGateway::new(
            GatewaySettings::default(),
            Arc::new(registry),
            SwitchTenant::new("acme"),
            MonitorHandle::disconnected(),
        );

        assert!(gateway.register_endpoint(rest_endpoint()).await.is_err());
        assert!(gateway.list_endpoints().is_empty());
    }

    #[tokio::test]
    async fn test_registration_rejects_unsupported_protocol() {
        let (gateway, _, _) = gateway_with_mock();
        let endpoint = Endpoint::new("acme", "orders", "https://soap.example", Protocol::Soap);
        let err = gateway.register_endpoint(endpoint).await.unwrap_err();
        assert!(matches!(err, FlowgateError::UnsupportedProtocol { .. }));
    }

    #[tokio::test]
    async fn test_unregister_requires_ownership() {
        let (gateway, tenants, _) = gateway_with_mock();
        let id = gateway.register_endpoint(rest_endpoint()).await.unwrap();

        tenants.switch("rival");
        let err = gateway.unregister_endpoint(id).unwrap_err();
        assert!(matches!(err, FlowgateError::AccessDenied { .. }));

        tenants.switch("acme");
        assert!(gateway.unregister_endpoint(id).is_ok());
        assert!(gateway.list_endpoints().is_empty());
    }

    #[tokio::test]
    async fn test_health_check_updates_cached_flags() {
        let (gateway, _, _) = gateway_with_mock();
        let id = gateway.register_endpoint(rest_endpoint()).await.unwrap();

        let report = gateway.check_endpoint_health(id).await.unwrap();
        assert!(!report.healthy);

        let endpoint = gateway.get_endpoint(id).unwrap();
        assert_eq!(endpoint.healthy, Some(false));
        assert!(endpoint.last_health_check.is_some());
    }

    #[tokio::test]
    async fn test_logs_are_tenant_scoped() {
        let (gateway, tenants, _) = gateway_with_mock();
        let id = gateway.register_endpoint(rest_endpoint()).await.unwrap();
        gateway
            .route_request(OutboundRequest::new(id, "GET", "/a"))
            .await;

        tenants.switch("rival");
        assert!(gateway.get_logs(None, None).await.is_empty());
    }
}
