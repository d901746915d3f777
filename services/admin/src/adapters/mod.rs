pub mod segmentation_llm;

pub use segmentation_llm::OpenAiSegmentationAdapter;
