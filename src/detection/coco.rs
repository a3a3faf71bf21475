/// COCO class labels in model output order
pub const LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

pub const CAR: u32 = 2;
pub const BUS: u32 = 5;
pub const TRUCK: u32 = 7;

/// car, bus, truck
pub const DEFAULT_VEHICLE_CLASSES: [u32; 3] = [CAR, BUS, TRUCK];

pub fn class_id(label: &str) -> Option<u32> {
    LABELS
        .iter()
        .position(|name| name.eq_ignore_ascii_case(label))
        .map(|idx| idx as u32)
}

pub fn label(class_id: u32) -> Option<&'static str> {
    LABELS.get(class_id as usize).copied()
}
