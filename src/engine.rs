export![context, framebuffer, shader, texture, vertex_array, webgl];
