// 領域層：表格模型與 Pipeline 依賴的介面

pub mod model;
pub mod ports;
