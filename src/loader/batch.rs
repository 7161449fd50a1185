//! Request descriptions accepted by `Loader::request` and
//! `Loader::request_ordered`.

use std::fmt;

use crate::error_handling::TopicError;

use super::topic::TopicLabel;

/// Callback fired by the loader on one of its own tasks.
pub type Callback = Box<dyn FnOnce() + 'static>;

/// A batch of resources requested together.
///
/// ```
/// use script_loader::BatchRequest;
///
/// let batch = BatchRequest::new(["jquery", "jquery.ui"])
///     .label("ui")
///     .on_complete(|| println!("ui ready"));
/// assert_eq!(batch.resources().len(), 2);
/// ```
pub struct BatchRequest {
    resources: Vec<String>,
    label: Option<String>,
    on_complete: Option<Callback>,
}

impl BatchRequest {
    /// A batch of the given resources, unlabeled and without callback.
    pub fn new<I, S>(resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BatchRequest {
            resources: resources.into_iter().map(Into::into).collect(),
            label: None,
            on_complete: None,
        }
    }

    /// Names the batch. Without a label the batch is named after its
    /// concatenated identifiers.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Callback fired once every resource in the batch has loaded.
    pub fn on_complete(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Raw resource names, in request order.
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    /// Rejects empty batches, empty resource names and bad labels.
    pub(crate) fn validate(&self) -> Result<Option<TopicLabel>, TopicError> {
        validate_step(&self.resources)?;
        self.label.clone().map(TopicLabel::new).transpose()
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Option<Callback>) {
        (self.resources, self.on_complete)
    }
}

fn validate_step(resources: &[String]) -> Result<(), TopicError> {
    if resources.is_empty() {
        return Err(TopicError::Empty);
    }
    if resources.iter().any(|r| r.trim().is_empty()) {
        return Err(TopicError::EmptyResource);
    }
    Ok(())
}

impl fmt::Debug for BatchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRequest")
            .field("resources", &self.resources)
            .field("label", &self.label)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl From<&str> for BatchRequest {
    fn from(resource: &str) -> Self {
        BatchRequest::new([resource])
    }
}

impl From<String> for BatchRequest {
    fn from(resource: String) -> Self {
        BatchRequest::new([resource])
    }
}

impl<S: Into<String>> From<Vec<S>> for BatchRequest {
    fn from(resources: Vec<S>) -> Self {
        BatchRequest::new(resources)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for BatchRequest {
    fn from(resources: [S; N]) -> Self {
        BatchRequest::new(resources)
    }
}

/// Resources loaded strictly one step after another.
///
/// Each step is a batch; step *i+1* is requested only once every resource of
/// step *i* has loaded. The label and callback belong to the final step.
pub struct OrderedRequest {
    steps: Vec<Vec<String>>,
    label: Option<String>,
    on_complete: Option<Callback>,
}

impl OrderedRequest {
    /// One step per resource.
    pub fn new<I, S>(resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_steps(resources.into_iter().map(|r| vec![r.into()]))
    }

    /// Explicit steps, each loading a batch of resources in parallel.
    pub fn from_steps<I, B, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OrderedRequest {
            steps: steps
                .into_iter()
                .map(|step| step.into_iter().map(Into::into).collect())
                .collect(),
            label: None,
            on_complete: None,
        }
    }

    /// Names the final step.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Callback fired once the final step has loaded.
    pub fn on_complete(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Steps in load order.
    pub fn steps(&self) -> &[Vec<String>] {
        &self.steps
    }

    /// Validates every step up front so a chain never stops half way on a
    /// malformed step.
    pub(crate) fn validate(&self) -> Result<Option<TopicLabel>, TopicError> {
        if self.steps.is_empty() {
            return Err(TopicError::Empty);
        }
        for step in &self.steps {
            validate_step(step)?;
        }
        self.label.clone().map(TopicLabel::new).transpose()
    }

    pub(crate) fn into_parts(self) -> (Vec<Vec<String>>, Option<Callback>) {
        (self.steps, self.on_complete)
    }
}

impl fmt::Debug for OrderedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedRequest")
            .field("steps", &self.steps)
            .field("label", &self.label)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl<S: Into<String>> From<Vec<S>> for OrderedRequest {
    fn from(resources: Vec<S>) -> Self {
        OrderedRequest::new(resources)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for OrderedRequest {
    fn from(resources: [S; N]) -> Self {
        OrderedRequest::new(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_from_single_resource() {
        let batch = BatchRequest::from("alpha");
        assert_eq!(batch.resources(), &["alpha".to_string()]);
        assert_eq!(batch.validate(), Ok(None));
    }

    #[test]
    fn test_batch_label_is_validated() {
        let batch = BatchRequest::from(vec!["a", "b"]).label("ab");
        assert_eq!(batch.validate(), Ok(Some(TopicLabel::new("ab").unwrap())));

        let bad = BatchRequest::from("a").label("");
        assert_eq!(bad.validate(), Err(TopicError::EmptyLabel));

        let bad = BatchRequest::from("a").label("x|y");
        assert!(matches!(
            bad.validate(),
            Err(TopicError::ReservedDelimiter(_))
        ));
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let batch = BatchRequest::new(Vec::<String>::new());
        assert_eq!(batch.validate(), Err(TopicError::Empty));

        let batch = BatchRequest::from(["a", " "]);
        assert_eq!(batch.validate(), Err(TopicError::EmptyResource));
    }

    #[test]
    fn test_ordered_request_one_step_per_resource() {
        let ordered = OrderedRequest::from(["p", "q"]);
        assert_eq!(
            ordered.steps(),
            &[vec!["p".to_string()], vec!["q".to_string()]]
        );
    }

    #[test]
    fn test_ordered_request_nested_steps() {
        let ordered = OrderedRequest::from_steps(vec![vec!["base"], vec!["plugin-a", "plugin-b"]]);
        assert_eq!(ordered.steps().len(), 2);
        assert_eq!(ordered.steps()[1].len(), 2);
        assert_eq!(ordered.validate(), Ok(None));
    }

    #[test]
    fn test_ordered_request_rejects_empty_step() {
        let ordered = OrderedRequest::from_steps(vec![vec!["base"], vec![]]);
        assert_eq!(ordered.validate(), Err(TopicError::Empty));

        let ordered = OrderedRequest::new(Vec::<String>::new());
        assert_eq!(ordered.validate(), Err(TopicError::Empty));
    }

    #[test]
    fn test_debug_hides_callback() {
        let batch = BatchRequest::from("a").on_complete(|| {});
        let rendered = format!("{:?}", batch);
        assert!(rendered.contains("on_complete: true"));
    }
}
