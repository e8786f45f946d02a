/// Side of the square crop fed to the network.
pub const INPUT_SIZE: u32 = 224;

/// The shorter image edge is scaled to this length before cropping.
pub const RESIZE_SHORTER_EDGE: u32 = 256;

/// Per-channel means in R, G, B order. Must match the training statistics.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel standard deviations in R, G, B order.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
