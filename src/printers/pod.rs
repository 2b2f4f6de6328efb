//! Pod printer.
//!
//! Derives the STATUS column from container states the same way
//! `kubectl get pods` does, including init container progress and
//! termination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::duration::translate_timestamp_since;
use super::{Cell, ColumnDefinition, RowCondition, Table, TableRow, NONE};

/// Columns of the wide pod listing.
pub const POD_COLUMNS: &[ColumnDefinition] = &[
    ColumnDefinition { name: "Name", priority: 0 },
    ColumnDefinition { name: "Ready", priority: 0 },
    ColumnDefinition { name: "Status", priority: 0 },
    ColumnDefinition { name: "Restarts", priority: 0 },
    ColumnDefinition { name: "Age", priority: 0 },
    ColumnDefinition { name: "IP", priority: 1 },
    ColumnDefinition { name: "Node", priority: 1 },
    ColumnDefinition { name: "Nominated Node", priority: 1 },
    ColumnDefinition { name: "Readiness Gates", priority: 1 },
];

/// Status reason set by the node controller on pods of a lost node.
const NODE_UNREACHABLE_POD_REASON: &str = "NodeLost";

/// Treat an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Pod {
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: ObjectMeta,
    #[serde(deserialize_with = "null_as_default")]
    pub spec: PodSpec,
    #[serde(deserialize_with = "null_as_default")]
    pub status: PodStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub namespace: String,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(deserialize_with = "null_as_default")]
    pub containers: Vec<Container>,
    #[serde(deserialize_with = "null_as_default")]
    pub init_containers: Vec<Container>,
    #[serde(deserialize_with = "null_as_default")]
    pub node_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub readiness_gates: Vec<PodReadinessGate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Container {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PodReadinessGate {
    #[serde(deserialize_with = "null_as_default")]
    pub condition_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PodStatus {
    #[serde(deserialize_with = "null_as_default")]
    pub phase: String,
    #[serde(deserialize_with = "null_as_default")]
    pub reason: String,
    #[serde(deserialize_with = "null_as_default")]
    pub nominated_node_name: String,
    #[serde(rename = "podIP", deserialize_with = "null_as_default")]
    pub pod_ip: String,
    #[serde(rename = "podIPs", deserialize_with = "null_as_default")]
    pub pod_ips: Vec<PodIp>,
    #[serde(deserialize_with = "null_as_default")]
    pub conditions: Vec<PodCondition>,
    #[serde(deserialize_with = "null_as_default")]
    pub init_container_statuses: Vec<ContainerStatus>,
    #[serde(deserialize_with = "null_as_default")]
    pub container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PodIp {
    #[serde(deserialize_with = "null_as_default")]
    pub ip: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PodCondition {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub condition_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerStatus {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ready: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub restart_count: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub state: ContainerState,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContainerState {
    pub waiting: Option<ContainerStateWaiting>,
    pub running: Option<ContainerStateRunning>,
    pub terminated: Option<ContainerStateTerminated>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContainerStateWaiting {
    #[serde(deserialize_with = "null_as_default")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerStateRunning {
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerStateTerminated {
    #[serde(deserialize_with = "null_as_default")]
    pub exit_code: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub signal: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub reason: String,
}

impl PodStatus {
    fn primary_ip(&self) -> &str {
        self.pod_ips
            .first()
            .map(|ip| ip.ip.as_str())
            .filter(|ip| !ip.is_empty())
            .unwrap_or(self.pod_ip.as_str())
    }

    fn condition_is_true(&self, condition_type: &str) -> Option<bool> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
            .map(|c| c.status == "True")
    }
}

/// Build the one-row table for a pod, ages measured against `now`.
pub fn pod_table(pod: &Pod, now: DateTime<Utc>) -> Table {
    Table {
        column_definitions: POD_COLUMNS,
        rows: vec![print_pod(pod, now)],
    }
}

pub fn print_pod(pod: &Pod, now: DateTime<Utc>) -> TableRow {
    let status = &pod.status;
    let total_containers = pod.spec.containers.len();
    let mut ready_containers = 0;
    let mut restarts: i64 = 0;
    let mut reason = if status.reason.is_empty() {
        status.phase.clone()
    } else {
        status.reason.clone()
    };

    let conditions = match status.phase.as_str() {
        "Succeeded" => vec![RowCondition {
            reason: "Succeeded".to_string(),
            message: "The pod has completed successfully.".to_string(),
        }],
        "Failed" => vec![RowCondition {
            reason: "Failed".to_string(),
            message: "The pod failed.".to_string(),
        }],
        _ => Vec::new(),
    };

    // Stop at the first init container that has not exited cleanly.
    let mut initializing = false;
    for (i, container) in status.init_container_statuses.iter().enumerate() {
        restarts += i64::from(container.restart_count);
        let state = &container.state;
        match (&state.terminated, &state.waiting) {
            (Some(t), _) if t.exit_code == 0 => continue,
            (Some(t), _) => {
                reason = if !t.reason.is_empty() {
                    format!("Init:{}", t.reason)
                } else if t.signal != 0 {
                    format!("Init:Signal:{}", t.signal)
                } else {
                    format!("Init:ExitCode:{}", t.exit_code)
                };
            }
            (None, Some(w)) if !w.reason.is_empty() && w.reason != "PodInitializing" => {
                reason = format!("Init:{}", w.reason);
            }
            _ => {
                reason = format!("Init:{}/{}", i, pod.spec.init_containers.len());
            }
        }
        initializing = true;
        break;
    }

    if !initializing {
        restarts = 0;
        let mut has_running = false;
        for container in status.container_statuses.iter().rev() {
            restarts += i64::from(container.restart_count);
            let state = &container.state;
            if let Some(w) = state.waiting.as_ref().filter(|w| !w.reason.is_empty()) {
                reason = w.reason.clone();
            } else if let Some(t) = &state.terminated {
                reason = if !t.reason.is_empty() {
                    t.reason.clone()
                } else if t.signal != 0 {
                    format!("Signal:{}", t.signal)
                } else {
                    format!("ExitCode:{}", t.exit_code)
                };
            } else if container.ready && state.running.is_some() {
                has_running = true;
                ready_containers += 1;
            }
        }

        if reason == "Completed" && has_running {
            reason = if status.condition_is_true("Ready") == Some(true) {
                "Running".to_string()
            } else {
                "NotReady".to_string()
            };
        }
    }

    if pod.metadata.deletion_timestamp.is_some() {
        reason = if status.reason == NODE_UNREACHABLE_POD_REASON {
            "Unknown".to_string()
        } else {
            "Terminating".to_string()
        };
    }

    let readiness_gates = if pod.spec.readiness_gates.is_empty() {
        NONE.to_string()
    } else {
        let true_conditions = pod
            .spec
            .readiness_gates
            .iter()
            .filter(|gate| status.condition_is_true(&gate.condition_type) == Some(true))
            .count();
        format!("{}/{}", true_conditions, pod.spec.readiness_gates.len())
    };

    TableRow {
        cells: vec![
            pod.metadata.name.as_str().into(),
            format!("{}/{}", ready_containers, total_containers).into(),
            reason.into(),
            restarts.into(),
            translate_timestamp_since(pod.metadata.creation_timestamp, now).into(),
            or_none(status.primary_ip()),
            or_none(&pod.spec.node_name),
            or_none(&status.nominated_node_name),
            readiness_gates.into(),
        ],
        conditions,
    }
}

fn or_none(value: &str) -> Cell {
    if value.is_empty() {
        NONE.into()
    } else {
        value.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 3, 1, 12, 0, 0).unwrap()
    }

    fn pod(value: serde_json::Value) -> Pod {
        serde_json::from_value(value).unwrap()
    }

    fn status_of(row: &TableRow) -> &Cell {
        &row.cells[2]
    }

    #[test]
    fn test_running_pod_row() {
        let p = pod(json!({
            "metadata": {"name": "coredns-8474476ff8-lfwcf", "creationTimestamp": "2021-07-29T12:00:00Z"},
            "spec": {"containers": [{"name": "coredns"}], "nodeName": "hu2-vmp6"},
            "status": {
                "phase": "Running",
                "podIP": "10.92.86.76",
                "podIPs": [{"ip": "10.92.86.76"}],
                "containerStatuses": [{
                    "name": "coredns", "ready": true, "restartCount": 0,
                    "state": {"running": {"startedAt": "2021-07-29T12:00:05Z"}}
                }]
            }
        }));

        let row = print_pod(&p, now());
        assert_eq!(
            row.cells,
            vec![
                Cell::from("coredns-8474476ff8-lfwcf"),
                Cell::from("1/1"),
                Cell::from("Running"),
                Cell::Integer(0),
                Cell::from("215d"),
                Cell::from("10.92.86.76"),
                Cell::from("hu2-vmp6"),
                Cell::from(NONE),
                Cell::from(NONE),
            ]
        );
        assert!(row.conditions.is_empty());
    }

    #[test]
    fn test_completed_pod_has_success_condition() {
        let p = pod(json!({
            "metadata": {"name": "secret-generator--1-jvbz8"},
            "spec": {"containers": [{"name": "gen"}]},
            "status": {
                "phase": "Succeeded",
                "containerStatuses": [{
                    "name": "gen", "ready": false, "restartCount": 0,
                    "state": {"terminated": {"exitCode": 0, "reason": "Completed"}}
                }]
            }
        }));

        let row = print_pod(&p, now());
        assert_eq!(status_of(&row), &Cell::from("Completed"));
        assert_eq!(row.cells[1], Cell::from("0/1"));
        assert_eq!(row.cells[4], Cell::from("<unknown>"));
        assert_eq!(
            row.conditions,
            vec![RowCondition {
                reason: "Succeeded".into(),
                message: "The pod has completed successfully.".into()
            }]
        );
    }

    #[test]
    fn test_crash_loop_sums_restarts() {
        let p = pod(json!({
            "spec": {"containers": [{"name": "a"}, {"name": "b"}]},
            "status": {
                "phase": "Running",
                "containerStatuses": [
                    {"name": "a", "ready": false, "restartCount": 3778,
                     "state": {"waiting": {"reason": "CrashLoopBackOff"}}},
                    {"name": "b", "ready": true, "restartCount": 2,
                     "state": {"running": {}}}
                ]
            }
        }));

        let row = print_pod(&p, now());
        assert_eq!(status_of(&row), &Cell::from("CrashLoopBackOff"));
        assert_eq!(row.cells[1], Cell::from("1/2"));
        assert_eq!(row.cells[3], Cell::Integer(3780));
    }

    #[test]
    fn test_terminated_without_reason() {
        let signal = pod(json!({
            "spec": {"containers": [{"name": "a"}]},
            "status": {"phase": "Running", "containerStatuses": [
                {"name": "a", "state": {"terminated": {"exitCode": 137, "signal": 9}}}
            ]}
        }));
        let exit = pod(json!({
            "spec": {"containers": [{"name": "a"}]},
            "status": {"phase": "Running", "containerStatuses": [
                {"name": "a", "state": {"terminated": {"exitCode": 2}}}
            ]}
        }));

        assert_eq!(status_of(&print_pod(&signal, now())), &Cell::from("Signal:9"));
        assert_eq!(status_of(&print_pod(&exit, now())), &Cell::from("ExitCode:2"));
    }

    #[test]
    fn test_init_container_states() {
        let crash = pod(json!({
            "spec": {"initContainers": [{"name": "init"}], "containers": [{"name": "app"}]},
            "status": {
                "phase": "Pending",
                "initContainerStatuses": [{"name": "init", "restartCount": 5345,
                    "state": {"waiting": {"reason": "CrashLoopBackOff"}}}],
                "containerStatuses": [{"name": "app", "restartCount": 0,
                    "state": {"waiting": {"reason": "PodInitializing"}}}]
            }
        }));
        let running = pod(json!({
            "spec": {"initContainers": [{"name": "init"}], "containers": [{"name": "app"}]},
            "status": {
                "phase": "Pending",
                "initContainerStatuses": [{"name": "init", "state": {"running": {}}}]
            }
        }));
        let failed = pod(json!({
            "spec": {"initContainers": [{"name": "a"}, {"name": "b"}], "containers": [{"name": "app"}]},
            "status": {
                "phase": "Pending",
                "initContainerStatuses": [
                    {"name": "a", "state": {"terminated": {"exitCode": 0}}},
                    {"name": "b", "state": {"terminated": {"exitCode": 1}}}
                ]
            }
        }));

        let row = print_pod(&crash, now());
        assert_eq!(status_of(&row), &Cell::from("Init:CrashLoopBackOff"));
        assert_eq!(row.cells[3], Cell::Integer(5345));
        assert_eq!(status_of(&print_pod(&running, now())), &Cell::from("Init:0/1"));
        assert_eq!(status_of(&print_pod(&failed, now())), &Cell::from("Init:ExitCode:1"));
    }

    #[test]
    fn test_completed_with_running_container() {
        let mut p = pod(json!({
            "spec": {"containers": [{"name": "a"}, {"name": "b"}]},
            "status": {
                "phase": "Running",
                "conditions": [{"type": "Ready", "status": "False"}],
                "containerStatuses": [
                    {"name": "a", "ready": true, "state": {"running": {}}},
                    {"name": "b", "state": {"terminated": {"exitCode": 0, "reason": "Completed"}}}
                ]
            }
        }));
        assert_eq!(status_of(&print_pod(&p, now())), &Cell::from("NotReady"));

        p.status.conditions[0].status = "True".into();
        assert_eq!(status_of(&print_pod(&p, now())), &Cell::from("Running"));
    }

    #[test]
    fn test_deleted_pod() {
        let mut p = pod(json!({
            "metadata": {"deletionTimestamp": "2022-03-01T11:59:00Z"},
            "spec": {"containers": [{"name": "a"}]},
            "status": {"phase": "Running"}
        }));
        assert_eq!(status_of(&print_pod(&p, now())), &Cell::from("Terminating"));

        p.status.reason = NODE_UNREACHABLE_POD_REASON.into();
        assert_eq!(status_of(&print_pod(&p, now())), &Cell::from("Unknown"));
    }

    #[test]
    fn test_readiness_gates_and_failed_phase() {
        let p = pod(json!({
            "spec": {
                "containers": [{"name": "a"}],
                "readinessGates": [{"conditionType": "example.com/lb"}, {"conditionType": "example.com/dns"}]
            },
            "status": {
                "phase": "Failed",
                "nominatedNodeName": "node-2",
                "podIP": "10.0.0.9",
                "conditions": [{"type": "example.com/lb", "status": "True"}]
            }
        }));

        let row = print_pod(&p, now());
        assert_eq!(row.cells[5], Cell::from("10.0.0.9"));
        assert_eq!(row.cells[7], Cell::from("node-2"));
        assert_eq!(row.cells[8], Cell::from("1/2"));
        assert_eq!(row.conditions[0].reason, "Failed");
    }

    #[test]
    fn test_pod_table_has_one_row_per_column_set() {
        let table = pod_table(&Pod::default(), now());
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].cells.len(), POD_COLUMNS.len());
    }

    #[test]
    fn test_explicit_nulls_read_as_absent() {
        let p = pod(json!({
            "metadata": {"name": "web-0", "namespace": null},
            "spec": {"containers": [{"name": "app"}], "initContainers": null, "nodeName": null, "readinessGates": null},
            "status": {
                "phase": "Pending",
                "podIP": null,
                "podIPs": null,
                "conditions": null,
                "containerStatuses": [{"name": "app", "ready": null, "restartCount": null, "state": null}]
            }
        }));

        let row = print_pod(&p, now());
        assert_eq!(row.cells[1], Cell::from("0/1"));
        assert_eq!(row.cells[2], Cell::from("Pending"));
        assert_eq!(row.cells[3], Cell::Integer(0));
        assert_eq!(row.cells[5], Cell::from(NONE));
        assert_eq!(row.cells[6], Cell::from(NONE));
    }
}
