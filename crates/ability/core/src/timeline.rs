//! Frame-indexed task scheduler.
//!
//! Each unit owns one [`TimelineScheduler`]. It tracks running Animation and
//! Wait tasks plus lifetimes of duration-bound cues, advances them one frame
//! per [`step`](TimelineScheduler::step), and reports what should happen as
//! [`TimelineAction`]s. The scheduler never touches the graph itself; the
//! runtime executes the actions.
//!
//! Animation task timing:
//!
//! - `OnStart` fires when the task starts, then entries due at frame 0
//! - a time effect fires once per playthrough when `elapsed >= trigger_time`
//! - a time cue window opens while `elapsed ∈ [start_time, end_time)` and
//!   closes on exit; `end_time == -1` closes only when the task ends
//! - at `duration_frames` a looping task restarts at frame 0 and re-arms its
//!   time effects; a non-looping task completes and fires `OnComplete`

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::graph::{AnimationTaskData, ports};
use crate::ids::{AnimationHandle, CueHandle, Frames, NodeGuid, RunId, SkillId, TaskId};

/// Graph location a task resumes at.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskPulse {
    pub task: TaskId,
    pub run: RunId,
    pub skill: SkillId,
    pub node: NodeGuid,
    pub context: Arc<ExecutionContext>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TimelineAction {
    /// Execute the nodes connected to `port`.
    FirePort { pulse: TaskPulse, port: String },
    /// Execute `port` and attach the cues it plays to the window.
    OpenCueWindow {
        pulse: TaskPulse,
        window: usize,
        port: String,
    },
    StopCues(Vec<CueHandle>),
    StopAnimation(AnimationHandle),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum WindowState {
    Closed,
    Open(Vec<CueHandle>),
}

#[derive(Clone, Debug)]
struct AnimationState {
    data: AnimationTaskData,
    fired: Vec<bool>,
    windows: Vec<WindowState>,
    handle: Option<AnimationHandle>,
    loops: u32,
}

#[derive(Clone, Debug)]
enum TaskKind {
    Animation(AnimationState),
    Wait { duration: Frames },
    CueLifetime { cue: CueHandle, duration: Frames },
}

#[derive(Clone, Debug)]
struct TimelineTask {
    pulse: Option<TaskPulse>,
    elapsed: Frames,
    kind: TaskKind,
}

impl TimelineTask {
    fn run(&self) -> Option<RunId> {
        self.pulse.as_ref().map(|pulse| pulse.run)
    }
}

/// Per-unit scheduler of frame-indexed tasks.
#[derive(Clone, Debug, Default)]
pub struct TimelineScheduler {
    tasks: BTreeMap<TaskId, TimelineTask>,
}

impl TimelineScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.tasks.contains_key(&task)
    }

    /// Elapsed frames of a running task.
    pub fn elapsed(&self, task: TaskId) -> Option<Frames> {
        self.tasks.get(&task).map(|task| task.elapsed)
    }

    /// Number of completed loops of an animation task.
    pub fn loops(&self, task: TaskId) -> Option<u32> {
        match &self.tasks.get(&task)?.kind {
            TaskKind::Animation(state) => Some(state.loops),
            _ => None,
        }
    }

    /// Tasks bound to `run`.
    pub fn tasks_for_run(&self, run: RunId) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|(_, task)| task.run() == Some(run))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Starts an animation task and evaluates frame 0.
    pub fn start_animation(
        &mut self,
        pulse: TaskPulse,
        data: AnimationTaskData,
        handle: Option<AnimationHandle>,
    ) -> Vec<TimelineAction> {
        let id = pulse.task;
        let mut actions = vec![TimelineAction::FirePort {
            pulse: pulse.clone(),
            port: ports::ON_START.to_owned(),
        }];
        let state = AnimationState {
            fired: vec![false; data.time_effects.len()],
            windows: vec![WindowState::Closed; data.time_cues.len()],
            data,
            handle,
            loops: 0,
        };
        let mut task = TimelineTask {
            pulse: Some(pulse),
            elapsed: 0,
            kind: TaskKind::Animation(state),
        };
        evaluate(&mut task, &mut actions);

        if animation_finished(&task) {
            complete(&mut task, &mut actions);
        } else {
            self.tasks.insert(id, task);
        }
        actions
    }

    /// Starts a wait task. A zero-length wait completes immediately.
    pub fn start_wait(&mut self, pulse: TaskPulse, duration: Frames) -> Vec<TimelineAction> {
        if duration == 0 {
            return vec![TimelineAction::FirePort {
                pulse,
                port: ports::ON_COMPLETE.to_owned(),
            }];
        }
        self.tasks.insert(
            pulse.task,
            TimelineTask {
                pulse: Some(pulse),
                elapsed: 0,
                kind: TaskKind::Wait { duration },
            },
        );
        Vec::new()
    }

    /// Schedules a stop for a duration-bound cue. Not tied to any run.
    pub fn start_cue_lifetime(&mut self, task: TaskId, cue: CueHandle, duration: Frames) {
        self.tasks.insert(
            task,
            TimelineTask {
                pulse: None,
                elapsed: 0,
                kind: TaskKind::CueLifetime { cue, duration },
            },
        );
    }

    /// Attaches cues played while a window opened.
    ///
    /// Returns the cues back when the window is no longer open, so the caller
    /// can stop them right away.
    pub fn attach_window_cues(
        &mut self,
        task: TaskId,
        window: usize,
        cues: Vec<CueHandle>,
    ) -> Result<(), Vec<CueHandle>> {
        let Some(TimelineTask {
            kind: TaskKind::Animation(state),
            ..
        }) = self.tasks.get_mut(&task)
        else {
            return Err(cues);
        };
        match state.windows.get_mut(window) {
            Some(WindowState::Open(open)) => {
                open.extend(cues);
                Ok(())
            }
            _ => Err(cues),
        }
    }

    /// Advances every task by one frame.
    pub fn step(&mut self) -> Vec<TimelineAction> {
        let mut actions = Vec::new();
        let mut finished = Vec::new();

        for (id, task) in self.tasks.iter_mut() {
            task.elapsed = task.elapsed.saturating_add(1);
            match task.kind {
                TaskKind::Animation(_) => {
                    evaluate(task, &mut actions);
                    if animation_finished(task) {
                        if restart_loop(task) {
                            evaluate(task, &mut actions);
                        } else {
                            complete(task, &mut actions);
                            finished.push(*id);
                        }
                    }
                }
                TaskKind::Wait { duration } => {
                    if task.elapsed >= duration {
                        if let Some(pulse) = task.pulse.clone() {
                            actions.push(TimelineAction::FirePort {
                                pulse,
                                port: ports::ON_COMPLETE.to_owned(),
                            });
                        }
                        finished.push(*id);
                    }
                }
                TaskKind::CueLifetime { cue, duration } => {
                    if task.elapsed >= duration {
                        actions.push(TimelineAction::StopCues(vec![cue]));
                        finished.push(*id);
                    }
                }
            }
        }

        for id in finished {
            self.tasks.remove(&id);
        }
        actions
    }

    /// Removes every task of `run` without firing completion ports.
    pub fn cancel_run(&mut self, run: RunId) -> Vec<TimelineAction> {
        let mut actions = Vec::new();
        for id in self.tasks_for_run(run) {
            if let Some(mut task) = self.tasks.remove(&id) {
                release(&mut task, &mut actions);
            }
        }
        actions
    }
}

fn animation_finished(task: &TimelineTask) -> bool {
    match &task.kind {
        TaskKind::Animation(state) => task.elapsed >= state.data.duration_frames,
        _ => false,
    }
}

/// Wraps a looping animation back to frame 0. Zero-length animations never
/// loop.
fn restart_loop(task: &mut TimelineTask) -> bool {
    let TaskKind::Animation(state) = &mut task.kind else {
        return false;
    };
    if !state.data.is_animation_looping || state.data.duration_frames == 0 {
        return false;
    }
    task.elapsed = 0;
    state.loops += 1;
    state.fired.iter_mut().for_each(|fired| *fired = false);
    true
}

/// Fires due time effects and opens or closes cue windows at the current
/// elapsed frame.
fn evaluate(task: &mut TimelineTask, actions: &mut Vec<TimelineAction>) {
    let elapsed = task.elapsed;
    let Some(pulse) = task.pulse.clone() else {
        return;
    };
    let TaskKind::Animation(state) = &mut task.kind else {
        return;
    };

    for (entry, fired) in state.data.time_effects.iter().zip(state.fired.iter_mut()) {
        if !*fired && elapsed >= entry.trigger_time {
            *fired = true;
            actions.push(TimelineAction::FirePort {
                pulse: pulse.clone(),
                port: entry.port.clone(),
            });
        }
    }

    for (index, (entry, window)) in state
        .data
        .time_cues
        .iter()
        .zip(state.windows.iter_mut())
        .enumerate()
    {
        let inside = entry.contains(elapsed);
        match window {
            WindowState::Closed if inside => {
                *window = WindowState::Open(Vec::new());
                actions.push(TimelineAction::OpenCueWindow {
                    pulse: pulse.clone(),
                    window: index,
                    port: entry.port.clone(),
                });
            }
            WindowState::Open(cues) if !inside => {
                actions.push(TimelineAction::StopCues(std::mem::take(cues)));
                *window = WindowState::Closed;
            }
            _ => {}
        }
    }
}

/// Closes windows and stops playback.
fn release(task: &mut TimelineTask, actions: &mut Vec<TimelineAction>) {
    if let TaskKind::Animation(state) = &mut task.kind {
        for window in state.windows.iter_mut() {
            if let WindowState::Open(cues) = window {
                actions.push(TimelineAction::StopCues(std::mem::take(cues)));
                *window = WindowState::Closed;
            }
        }
        if let Some(handle) = state.handle.take() {
            actions.push(TimelineAction::StopAnimation(handle));
        }
    }
}

fn complete(task: &mut TimelineTask, actions: &mut Vec<TimelineAction>) {
    release(task, actions);
    if let Some(pulse) = task.pulse.clone() {
        actions.push(TimelineAction::FirePort {
            pulse,
            port: ports::ON_COMPLETE.to_owned(),
        });
    }
}
