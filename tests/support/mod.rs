// ABOUTME: Test support utilities.
// ABOUTME: In-memory engine, scripted prompt, and tracing setup for integration tests.

use async_trait::async_trait;
use dregs::engine::{
    ContainerError, ContainerFilters, ContainerOps, ContainerStatus, ContainerSummary, ImageError,
    ImageFilter, ImageOps, ImageSummary, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use dregs::output::Transcript;
use dregs::prompt::{Menu, Prompt};
use dregs::types::{ContainerId, ImageId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("dregs=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// An engine call, as recorded by [`FakeEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListImages(ImageFilter),
    ListChildren(ImageId),
    ListContainers { ancestor: Option<ImageId> },
    RemoveImage { id: ImageId, force: bool },
    RemoveContainer { id: ContainerId, force: bool },
}

#[derive(Default)]
struct State {
    images: Vec<ImageSummary>,
    containers: Vec<ContainerSummary>,
    calls: Vec<Call>,
    unavailable: bool,
    unavailable_on_remove: HashSet<ImageId>,
    stubborn: HashMap<ImageId, String>,
    unremovable_containers: HashSet<ContainerId>,
}

/// In-memory engine that refuses deletes the way Docker does.
///
/// - A plain delete fails while any container uses the image or any image
///   names it as parent.
/// - Listing by ancestor also returns containers of descendant images.
/// - A forced delete still fails while child images exist.
/// - Images marked stubborn refuse every delete with their message.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<State>,
}

#[allow(dead_code)]
impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(self, id: &str, tags: &[&str]) -> Self {
        self.state.lock().images.push(summary(id, tags, None));
        self
    }

    /// Add image `id` layered on `parent`.
    pub fn child(self, id: &str, parent: &str) -> Self {
        self.state
            .lock()
            .images
            .push(summary(id, &[], Some(ImageId::new(parent))));
        self
    }

    pub fn container(self, id: &str, image: &str, status: ContainerStatus) -> Self {
        let container = ContainerSummary {
            id: ContainerId::new(id),
            name: format!("{id}-name"),
            image: image.to_string(),
            image_id: ImageId::new(image),
            status,
        };
        self.state.lock().containers.push(container);
        self
    }

    /// Every delete of `id`, forced or not, fails with `message`.
    pub fn stubborn(self, id: &str, message: &str) -> Self {
        self.state
            .lock()
            .stubborn
            .insert(ImageId::new(id), message.to_string());
        self
    }

    /// Removing container `id` fails with a conflict.
    pub fn unremovable(self, id: &str) -> Self {
        self.state
            .lock()
            .unremovable_containers
            .insert(ContainerId::new(id));
        self
    }

    /// The engine drops off the network when asked to delete `id`.
    pub fn unavailable_on_remove(self, id: &str) -> Self {
        self.state
            .lock()
            .unavailable_on_remove
            .insert(ImageId::new(id));
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn has_image(&self, id: &str) -> bool {
        let id = ImageId::new(id);
        self.state.lock().images.iter().any(|img| img.id == id)
    }

    pub fn has_container(&self, id: &str) -> bool {
        let id = ContainerId::new(id);
        self.state.lock().containers.iter().any(|c| c.id == id)
    }

    pub fn force_deletes(&self) -> Vec<ImageId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::RemoveImage { id, force: true } => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn container_removals(&self) -> Vec<ContainerId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::RemoveContainer { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn removal_attempts(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::RemoveImage { .. } | Call::RemoveContainer { .. }))
            .count()
    }
}

fn summary(id: &str, tags: &[&str], parent: Option<ImageId>) -> ImageSummary {
    ImageSummary {
        id: ImageId::new(id),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        parent,
        created: Default::default(),
        size: 1024,
    }
}

/// Whether `image` is `ancestor` or is layered on it, as the engines'
/// `ancestor=` filter matches.
fn descends_from(images: &[ImageSummary], image: &ImageId, ancestor: &ImageId) -> bool {
    let mut current = Some(image.clone());
    let mut hops = 0;
    while let Some(id) = current {
        if &id == ancestor {
            return true;
        }
        hops += 1;
        if hops > images.len() {
            return false;
        }
        current = images
            .iter()
            .find(|img| img.id == id)
            .and_then(|img| img.parent.clone());
    }
    false
}

const OFFLINE: &str = "Cannot connect to the engine socket";

#[async_trait]
impl ImageOps for FakeEngine {
    async fn list_images(&self, filter: ImageFilter) -> Result<Vec<ImageSummary>, ImageError> {
        let mut state = self.state.lock();
        state.calls.push(Call::ListImages(filter));
        if state.unavailable {
            return Err(ImageError::Unavailable(OFFLINE.to_string()));
        }
        Ok(state
            .images
            .iter()
            .filter(|img| filter == ImageFilter::All || img.is_dangling())
            .cloned()
            .collect())
    }

    async fn list_children(&self, parent: &ImageId) -> Result<Vec<ImageSummary>, ImageError> {
        let mut state = self.state.lock();
        state.calls.push(Call::ListChildren(parent.clone()));
        if state.unavailable {
            return Err(ImageError::Unavailable(OFFLINE.to_string()));
        }
        Ok(state
            .images
            .iter()
            .filter(|img| img.parent.as_ref() == Some(parent))
            .cloned()
            .collect())
    }

    async fn remove_image(&self, id: &ImageId, force: bool) -> Result<(), ImageError> {
        let mut state = self.state.lock();
        state.calls.push(Call::RemoveImage {
            id: id.clone(),
            force,
        });
        if state.unavailable || state.unavailable_on_remove.contains(id) {
            state.unavailable = true;
            return Err(ImageError::Unavailable(OFFLINE.to_string()));
        }
        let Some(pos) = state.images.iter().position(|img| &img.id == id) else {
            return Err(ImageError::NotFound(id.to_string()));
        };
        if let Some(message) = state.stubborn.get(id) {
            return Err(ImageError::Conflict(message.clone()));
        }
        if state.images.iter().any(|img| img.parent.as_ref() == Some(id)) {
            return Err(ImageError::Conflict(format!(
                "unable to delete {id} (cannot be forced) - image has dependent child images"
            )));
        }
        if !force
            && let Some(container) = state.containers.iter().find(|c| &c.image_id == id)
        {
            return Err(ImageError::Conflict(format!(
                "unable to delete {id} (must be forced) - image is being used by container {}",
                container.id
            )));
        }
        state.images.remove(pos);
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for FakeEngine {
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut state = self.state.lock();
        state.calls.push(Call::ListContainers {
            ancestor: filters.ancestor.clone(),
        });
        if state.unavailable {
            return Err(ContainerError::Unavailable(OFFLINE.to_string()));
        }
        Ok(state
            .containers
            .iter()
            .filter(|c| filters.all || c.status == ContainerStatus::Running)
            .filter(|c| {
                filters
                    .ancestor
                    .as_ref()
                    .is_none_or(|a| descends_from(&state.images, &c.image_id, a))
            })
            .cloned()
            .collect())
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        state.calls.push(Call::RemoveContainer {
            id: id.clone(),
            force,
        });
        if state.unavailable {
            return Err(ContainerError::Unavailable(OFFLINE.to_string()));
        }
        if state.unremovable_containers.contains(id) {
            return Err(ContainerError::Conflict(format!(
                "container {id} is paused"
            )));
        }
        let Some(pos) = state.containers.iter().position(|c| &c.id == id) else {
            return Err(ContainerError::NotFound(id.to_string()));
        };
        if !force && state.containers[pos].status == ContainerStatus::Running {
            return Err(ContainerError::Conflict(format!(
                "cannot remove running container {id}"
            )));
        }
        state.containers.remove(pos);
        Ok(())
    }
}

#[async_trait]
impl RuntimeInfo for FakeEngine {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        Ok(RuntimeMetadata {
            name: "fake".to_string(),
            version: "0.0.0".to_string(),
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        if self.state.lock().unavailable {
            return Err(RuntimeInfoError::ConnectionFailed(OFFLINE.to_string()));
        }
        Ok(())
    }
}

/// Answers from a script, recording every question asked.
///
/// Once the script runs out every confirmation is declined. With a
/// transcript, each question is also logged there as `? question`.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<bool>,
    choices: VecDeque<usize>,
    transcript: Option<Transcript>,
    pub questions: Vec<String>,
}

#[allow(dead_code)]
impl ScriptedPrompt {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn choosing(choices: &[usize], answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            choices: choices.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Log questions into the transcript an `Output` writes to.
    pub fn with_transcript(mut self, transcript: &Transcript) -> Self {
        self.transcript = Some(transcript.clone());
        self
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&mut self, question: &str) -> bool {
        if let Some(transcript) = &self.transcript {
            transcript.push(format!("? {question}"));
        }
        self.questions.push(question.to_string());
        self.answers.pop_front().unwrap_or(false)
    }

    fn choose(&mut self, menu: &Menu) -> Option<usize> {
        self.questions.push(menu.title.clone());
        self.choices.pop_front()
    }
}
