use log::{debug, warn};
use trace_format::generic::{Activity, TraceEvent};

/// The two halves of a trace at a `FORK` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkBranches {
    /// The events the child executes, branch markers of this fork excluded.
    pub child: Vec<TraceEvent>,
    /// Index of the first event the parent executes after the fork.
    pub resume_at: usize,
}

/// Splits `trace` at the `FORK` event located at `fork_index`.
///
/// Scanning starts at the fork. Everything after `IF_CHILD` belongs to the
/// child until an `IF_PARENT` is seen, the parent branch up to `ENDIF` is
/// skipped and the events following `ENDIF` are shared by both processes.
/// An `EXEC` inside the child branch ends the child sequence since the image
/// replacement never returns, and the scan then stops at the next
/// `IF_PARENT`. Without an `EXEC`, the last `IF_PARENT` seen determines
/// where the parent resumes.
///
/// Without any `IF_PARENT` the parent resumes right after the fork. This is
/// the shape of a child sequence whose own nested fork had its `IF_PARENT`
/// and `ENDIF` consumed by the enclosing fork, and resuming there lets the
/// process still reach the events following its nested if-block.
pub fn extract_child_branch(trace: &[TraceEvent], fork_index: usize) -> ForkBranches {
    let mut child = Vec::new();
    let mut skip = true;
    let mut exec_seen = false;
    let mut parent_index = None;
    let mut parent_markers = 0;

    for (idx, event) in trace.iter().enumerate().skip(fork_index) {
        match event.activity() {
            Activity::IfChild if skip => {
                skip = false;
                continue;
            }
            Activity::IfParent => {
                skip = true;
                parent_index = Some(idx);
                parent_markers += 1;
                if exec_seen {
                    break;
                }
            }
            Activity::EndIf if skip => {
                skip = false;
                continue;
            }
            Activity::Exec if !skip => {
                skip = true;
                exec_seen = true;
                child.push(event.clone());
            }
            _ => {}
        }

        if !skip {
            child.push(event.clone());
        }
    }

    if parent_markers > 1 && !exec_seen {
        warn!(
            "FORK at trace position {fork_index} is followed by {parent_markers} IF_PARENT markers, the parent resumes after the last one"
        );
    }

    let resume_at = match parent_index {
        Some(idx) => idx + 1,
        None => {
            debug!("FORK at trace position {fork_index} has no IF_PARENT marker, the parent resumes after it");
            fork_index + 1
        }
    };

    ForkBranches { child, resume_at }
}

#[cfg(test)]
mod tests {
    use trace_format::generic::{Activity, TraceEvent};

    use super::extract_child_branch;

    fn ev(activity: Activity, parameter: u32) -> TraceEvent {
        TraceEvent::new(activity, parameter)
    }

    fn cpu(d: u32) -> TraceEvent {
        ev(Activity::Cpu, d)
    }

    fn marker(activity: Activity) -> TraceEvent {
        ev(activity, 0)
    }

    #[test]
    fn child_branch_without_parent_code() {
        let trace = vec![
            ev(Activity::Fork, 10),
            marker(Activity::IfChild),
            cpu(3),
            marker(Activity::IfParent),
            marker(Activity::EndIf),
        ];

        let branches = extract_child_branch(&trace, 0);
        assert_eq!(branches.child, vec![cpu(3)]);
        assert_eq!(branches.resume_at, 4);
    }

    #[test]
    fn parent_branch_is_excluded_and_tail_is_shared() {
        let trace = vec![
            cpu(1),
            ev(Activity::Fork, 10),
            marker(Activity::IfChild),
            cpu(2),
            marker(Activity::IfParent),
            cpu(4),
            marker(Activity::EndIf),
            cpu(8),
        ];

        let branches = extract_child_branch(&trace, 1);
        assert_eq!(branches.child, vec![cpu(2), cpu(8)]);
        assert_eq!(branches.resume_at, 5);
    }

    #[test]
    fn exec_in_child_ends_the_child_sequence() {
        let trace = vec![
            ev(Activity::Fork, 10),
            marker(Activity::IfChild),
            cpu(2),
            TraceEvent::exec("program1", 50),
            cpu(99),
            marker(Activity::IfParent),
            cpu(4),
            marker(Activity::EndIf),
            marker(Activity::IfParent),
            cpu(5),
        ];

        let branches = extract_child_branch(&trace, 0);
        assert_eq!(
            branches.child,
            vec![cpu(2), TraceEvent::exec("program1", 50)]
        );
        assert_eq!(branches.resume_at, 6);
    }

    #[test]
    fn nested_fork_before_exec_is_part_of_the_child() {
        let trace = vec![
            ev(Activity::Fork, 10),
            marker(Activity::IfChild),
            ev(Activity::Fork, 10),
            marker(Activity::IfChild),
            cpu(1),
            marker(Activity::IfParent),
            marker(Activity::EndIf),
            TraceEvent::exec("program1", 50),
            marker(Activity::IfParent),
            cpu(7),
            marker(Activity::EndIf),
        ];

        let branches = extract_child_branch(&trace, 0);
        assert_eq!(
            branches.child,
            vec![
                ev(Activity::Fork, 10),
                marker(Activity::IfChild),
                cpu(1),
                TraceEvent::exec("program1", 50),
            ]
        );
        assert_eq!(branches.resume_at, 9);
    }

    #[test]
    fn missing_parent_marker_resumes_after_the_fork() {
        let trace = vec![
            ev(Activity::Fork, 10),
            marker(Activity::IfChild),
            cpu(2),
            marker(Activity::EndIf),
            cpu(3),
        ];

        // ENDIF is only consumed while skipping, so the child keeps it
        let branches = extract_child_branch(&trace, 0);
        assert_eq!(branches.child, vec![cpu(2), marker(Activity::EndIf), cpu(3)]);
        assert_eq!(branches.resume_at, 1);

        let bare = vec![ev(Activity::Fork, 10), cpu(3)];
        let branches = extract_child_branch(&bare, 0);
        assert!(branches.child.is_empty());
        assert_eq!(branches.resume_at, 1);
    }

    #[test]
    fn nested_fork_keeps_the_events_after_its_if_block() {
        // The child sequence of an outer fork whose inner IF_PARENT and
        // ENDIF were consumed by the outer scan
        let trace = vec![
            ev(Activity::Fork, 10),
            marker(Activity::IfChild),
            cpu(1),
            TraceEvent::exec("program1", 50),
        ];

        let branches = extract_child_branch(&trace, 0);
        assert_eq!(
            branches.child,
            vec![cpu(1), TraceEvent::exec("program1", 50)]
        );
        assert_eq!(branches.resume_at, 1);
        assert_eq!(
            trace[branches.resume_at..].last(),
            Some(&TraceEvent::exec("program1", 50))
        );
    }

    #[test]
    fn sequential_forks_resume_after_last_parent_marker() {
        let trace = vec![
            ev(Activity::Fork, 10),
            marker(Activity::IfChild),
            cpu(1),
            marker(Activity::IfParent),
            marker(Activity::EndIf),
            ev(Activity::Fork, 10),
            marker(Activity::IfChild),
            cpu(2),
            marker(Activity::IfParent),
            marker(Activity::EndIf),
        ];

        let branches = extract_child_branch(&trace, 0);
        assert_eq!(
            branches.child,
            vec![cpu(1), ev(Activity::Fork, 10), marker(Activity::IfChild), cpu(2)]
        );
        assert_eq!(branches.resume_at, 9);
    }

    #[test]
    fn extraction_is_idempotent() {
        let trace = vec![
            ev(Activity::Fork, 10),
            marker(Activity::IfChild),
            ev(Activity::Syscall, 2),
            marker(Activity::IfParent),
            ev(Activity::EndIo, 2),
            marker(Activity::EndIf),
            cpu(8),
        ];

        assert_eq!(
            extract_child_branch(&trace, 0),
            extract_child_branch(&trace, 0)
        );
    }
}
