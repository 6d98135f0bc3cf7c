use jsonrpsee::http_server::HttpServerHandle;

use zbgp::api::{serve_rpc_api, Global, Path, RibClient, RibControl, RibError, RibService};
use zbgp::health::HealthStatus;
use zbgp::logging::LogContext;
use zbgp::reconcile::{PassSummary, Reconciler};
use zbgp::rib::{Family, RIB};

fn prefixes(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| p.to_string()).collect()
}

/// RIB service on a loopback port plus a reconciler connected to it
async fn local_rib() -> (RibService, HttpServerHandle, Reconciler<RibClient>) {
    let service = RibService::new(RIB::new(Global {
        asn: 65000,
        router_id: "1.1.1.1".parse().unwrap(),
        listen_port: 179,
    }));
    let (addr, handle) = serve_rpc_api(service.clone(), "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let client = RibClient::connect(addr).unwrap();
    let reconciler = Reconciler::new(client, LogContext::RECONCILE).await.unwrap();
    (service, handle, reconciler)
}

async fn advertised(service: &RibService) -> Vec<String> {
    let rib = service.rib();
    let rib = rib.read().await;
    rib.get_routes(Family::ipv4_unicast())
        .into_iter()
        .map(|d| d.prefix)
        .collect()
}

#[tokio::test]
async fn test_reconcile_against_rib_service() {
    let (service, _handle, reconciler) = local_rib().await;
    assert_eq!(reconciler.local_asn(), "65000");

    let desired = prefixes(&["10.0.0.0/24", "10.0.1.0/24"]);
    let summary = reconciler.reconcile(&desired, HealthStatus(0)).await.unwrap();
    assert_eq!(summary.added, 2);
    assert_eq!(advertised(&service).await, desired);

    // Unchanged inputs: nothing to do
    let summary = reconciler.reconcile(&desired, HealthStatus(0)).await.unwrap();
    assert_eq!(summary, PassSummary::default());

    let desired = prefixes(&["10.0.1.0/24", "10.0.2.0/24"]);
    let summary = reconciler.reconcile(&desired, HealthStatus(0)).await.unwrap();
    assert_eq!((summary.added, summary.deleted), (1, 1));
    assert_eq!(advertised(&service).await, desired);
}

#[tokio::test]
async fn test_unhealthy_withdraws_from_rib_service() {
    let (service, _handle, reconciler) = local_rib().await;
    let desired = prefixes(&["10.0.0.0/24", "172.16.0.0/12"]);
    reconciler.reconcile(&desired, HealthStatus(0)).await.unwrap();
    assert_eq!(advertised(&service).await.len(), 2);

    let summary = reconciler.reconcile(&desired, HealthStatus(1)).await.unwrap();
    assert_eq!(summary.deleted, 2);
    assert!(advertised(&service).await.is_empty());

    // Recovery re-advertises
    reconciler.reconcile(&desired, HealthStatus(0)).await.unwrap();
    assert_eq!(advertised(&service).await.len(), 2);
}

#[tokio::test]
async fn test_rib_service_rejects_mismatched_family() {
    let (_service, _handle, reconciler) = local_rib().await;
    let client = reconciler.into_rib();
    let path = Path::local(Family::ipv4_unicast(), "3001:db8::".parse().unwrap(), 64);
    assert!(matches!(
        client.add_path(path).await,
        Err(RibError::Rejected(_))
    ));
}
