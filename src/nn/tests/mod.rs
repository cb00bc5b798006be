mod graph_basic;
mod graph_forward;
mod node_conv2d;
mod node_dropout;
